use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{EmbedError, Result};

pub const BOS_TOKEN: &str = "<S>";
pub const EOS_TOKEN: &str = "</S>";
pub const UNK_TOKEN: &str = "<UNK>";

/// Word boundary marker. Must be present natively in every character vocabulary.
pub const SEPARATOR: char = ' ';

/// Token to index mapping for a character-level model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    tokens: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn from_map(tokens: HashMap<String, usize>) -> Self {
        Self { tokens }
    }

    /// Load a serialized `{"token": index}` JSON object.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
        let vocab: Vocabulary =
            serde_json::from_str(&json).map_err(|e| EmbedError::json(path, e))?;
        debug!(path = %path.display(), tokens = vocab.len(), "loaded vocabulary");
        Ok(vocab)
    }

    /// Load a vocabulary and bind the sentinels: `<S>` to 0, `</S>` to the
    /// last slot of a `vocab_size` table, `<UNK>` to `unk_idx`.
    pub fn load_normalized<P: AsRef<Path>>(
        path: P,
        vocab_size: usize,
        unk_idx: usize,
    ) -> Result<Self> {
        let raw = Self::load_json(path)?;
        Ok(ensure_special_tokens(
            &raw,
            0,
            vocab_size.saturating_sub(1),
            unk_idx,
        ))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| EmbedError::json(path, e))?;
        fs::write(path, json).map_err(|e| EmbedError::io(path, e))
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.tokens.get(token).copied()
    }

    /// Index of `token`, or `UnknownToken` reported at `position`.
    pub fn index_of(&self, token: &str, position: usize) -> Result<usize> {
        self.get(token).ok_or_else(|| EmbedError::UnknownToken {
            token: token.to_string(),
            position,
        })
    }

    pub fn char_index(&self, ch: char, position: usize) -> Result<usize> {
        let mut buf = [0u8; 4];
        self.index_of(ch.encode_utf8(&mut buf), position)
    }

    pub fn separator_index(&self) -> Result<usize> {
        self.char_index(SEPARATOR, 0)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tokens.iter().map(|(token, idx)| (token.as_str(), *idx))
    }
}

/// Bind the three sentinel tokens to their indices.
///
/// Every token already sitting on one of the three indices is dropped first,
/// then `<S>`, `</S>` and `<UNK>` are inserted in that order. When two indices
/// coincide all three keys exist, so callers should treat the shared index as
/// owned by whichever sentinel they look up. The input is left untouched.
pub fn ensure_special_tokens(
    vocab: &Vocabulary,
    bos_idx: usize,
    eos_idx: usize,
    unk_idx: usize,
) -> Vocabulary {
    let reserved = [bos_idx, eos_idx, unk_idx];
    let mut tokens: HashMap<String, usize> = vocab
        .tokens
        .iter()
        .filter(|(_, idx)| !reserved.contains(idx))
        .map(|(token, idx)| (token.clone(), *idx))
        .collect();

    tokens.insert(BOS_TOKEN.to_string(), bos_idx);
    tokens.insert(EOS_TOKEN.to_string(), eos_idx);
    tokens.insert(UNK_TOKEN.to_string(), unk_idx);

    Vocabulary { tokens }
}
