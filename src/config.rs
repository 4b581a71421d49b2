use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EmbedError, Result};
use crate::model::{DecimatorConfig, EncoderConfig};

pub const ENV_SAVETO: &str = "CHARNMT_SAVETO";
pub const ENV_SRC_VOCAB: &str = "CHARNMT_SRC_VOCAB";
pub const ENV_TRG_VOCAB: &str = "CHARNMT_TRG_VOCAB";

/// Model options of the character-level NMT system.
///
/// Decoder sizes are carried so one configuration file serves both training
/// and inspection, but only the encoder is built here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmtConfig {
    pub src_vocab: PathBuf,
    pub trg_vocab: PathBuf,
    pub src_vocab_size: usize,
    pub trg_vocab_size: usize,
    pub unk_id: usize,
    pub bos_token: String,
    pub enc_embed: usize,
    pub dec_embed: usize,
    pub src_dgru_nhids: usize,
    pub enc_nhids: usize,
    pub src_dgru_depth: usize,
    pub bidir_encoder_depth: usize,
    pub trg_dgru_nhids: usize,
    pub trg_igru_nhids: usize,
    pub dec_nhids: usize,
    pub transition_depth: usize,
    pub trg_igru_depth: usize,
    pub trg_dgru_depth: usize,
    /// Checkpoint path, without the recorder's file extension
    pub saveto: PathBuf,
}

impl Default for NmtConfig {
    fn default() -> Self {
        Self {
            src_vocab: PathBuf::from("data/vocab.src.json"),
            trg_vocab: PathBuf::from("data/vocab.trg.json"),
            src_vocab_size: 120,
            trg_vocab_size: 120,
            unk_id: 1,
            bos_token: "<S>".to_string(),
            enc_embed: 64,
            dec_embed: 64,
            src_dgru_nhids: 512,
            enc_nhids: 512,
            src_dgru_depth: 2,
            bidir_encoder_depth: 2,
            trg_dgru_nhids: 512,
            trg_igru_nhids: 1024,
            dec_nhids: 1024,
            transition_depth: 1,
            trg_igru_depth: 1,
            trg_dgru_depth: 1,
            saveto: PathBuf::from("search_model"),
        }
    }
}

impl NmtConfig {
    /// Defaults, or the JSON file at `path`, followed by environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| EmbedError::json(path, e))
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(saveto) = lookup(ENV_SAVETO) {
            self.saveto = PathBuf::from(saveto);
        }
        if let Some(src_vocab) = lookup(ENV_SRC_VOCAB) {
            self.src_vocab = PathBuf::from(src_vocab);
        }
        if let Some(trg_vocab) = lookup(ENV_TRG_VOCAB) {
            self.trg_vocab = PathBuf::from(trg_vocab);
        }
        self
    }

    /// Checks only what the model constructor needs.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("src_vocab_size", self.src_vocab_size),
            ("trg_vocab_size", self.trg_vocab_size),
            ("enc_embed", self.enc_embed),
            ("src_dgru_nhids", self.src_dgru_nhids),
            ("enc_nhids", self.enc_nhids),
            ("src_dgru_depth", self.src_dgru_depth),
            ("bidir_encoder_depth", self.bidir_encoder_depth),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(EmbedError::Config(format!("{name} must be greater than zero")));
        }

        if self.unk_id >= self.src_vocab_size || self.unk_id >= self.trg_vocab_size {
            return Err(EmbedError::Config(format!(
                "unk_id {} does not fit vocabularies of size {} and {}",
                self.unk_id, self.src_vocab_size, self.trg_vocab_size
            )));
        }

        Ok(())
    }

    pub fn src_eos_idx(&self) -> usize {
        self.src_vocab_size - 1
    }

    pub fn trg_eos_idx(&self) -> usize {
        self.trg_vocab_size - 1
    }

    pub fn decimator_config(&self) -> DecimatorConfig {
        DecimatorConfig::new(
            self.src_vocab_size,
            self.enc_embed,
            self.src_dgru_nhids,
            self.src_dgru_depth,
        )
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig::new(
            self.decimator_config(),
            self.enc_nhids,
            self.bidir_encoder_depth,
        )
    }
}
