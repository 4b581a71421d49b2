use burn::tensor::backend::Backend;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::error::{EmbedError, Result};
use crate::input::{build_input_dict, EncodedInput};
use crate::model::Decimator;
use crate::vocab::{Vocabulary, SEPARATOR};

pub const DEFAULT_WORD_LIST: &str = "wordlist";

pub const WORD_LIST_HELP: &str =
    "Please create a file named wordlist, and one word per line in this file";

/// Produces one vector per encoded word. The model forward pass stays behind
/// this seam.
pub trait WordEmbedder {
    fn embed(&self, input: &EncodedInput) -> Result<Vec<f64>>;

    fn embedding_dim(&self) -> usize;
}

/// Runs the decimator and keeps the first word of the first batch item.
#[derive(Debug)]
pub struct DecimatorEmbedder<B: Backend> {
    decimator: Decimator<B>,
    device: B::Device,
}

impl<B: Backend> DecimatorEmbedder<B> {
    pub fn new(decimator: Decimator<B>, device: B::Device) -> Self {
        Self { decimator, device }
    }
}

impl<B: Backend> WordEmbedder for DecimatorEmbedder<B> {
    fn embed(&self, input: &EncodedInput) -> Result<Vec<f64>> {
        if input.total_words() == 0 {
            return Err(EmbedError::EmptySampleMatrix {
                length: input.length(),
            });
        }

        let hidden_dim = self.decimator.hidden_dim();
        let output = self
            .decimator
            .forward_input(input.to_tensors(&self.device));
        let first_word = output.slice([0..1, 0..1, 0..hidden_dim]).reshape([hidden_dim]);

        let values: Vec<f32> = first_word
            .into_data()
            .to_vec()
            .map_err(|e| EmbedError::Tensor(format!("{:?}", e)))?;
        Ok(values.into_iter().map(f64::from).collect())
    }

    fn embedding_dim(&self) -> usize {
        self.decimator.hidden_dim()
    }
}

/// Embedding vectors with the label each one was computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordEmbeddings {
    /// Word with its trailing separator, as fed to the encoder
    pub labels: Vec<String>,
    pub vectors: Vec<Vec<f64>>,
}

impl WordEmbeddings {
    /// `(rows, dim)` of the embedding matrix
    pub fn shape(&self) -> (usize, usize) {
        (
            self.vectors.len(),
            self.vectors.first().map_or(0, |v| v.len()),
        )
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Read one word per line. A missing file is reported as `WordListMissing`.
pub fn read_word_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(EmbedError::WordListMissing(path.to_path_buf()))
        }
        Err(e) => return Err(EmbedError::io(path, e)),
    };

    Ok(content.trim().split('\n').map(str::to_string).collect())
}

/// Append the separator to every word, encode it and embed it.
pub fn embed_words<E: WordEmbedder>(
    embedder: &E,
    words: &[String],
    vocab: &Vocabulary,
) -> Result<WordEmbeddings> {
    let mut embeddings = WordEmbeddings::default();

    for word in words {
        let mut label = word.clone();
        label.push(SEPARATOR);

        let (length, encoded) = build_input_dict(&label, vocab)?;
        let vector = embedder.embed(&encoded)?;
        debug!(word = %word, length, dim = vector.len(), "embedded word");

        embeddings.labels.push(label);
        embeddings.vectors.push(vector);
    }

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DecimatorConfig;
    use burn::backend::NdArray;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    type TestBackend = NdArray;

    fn test_vocab() -> Vocabulary {
        let mut tokens: HashMap<String, usize> = HashMap::new();
        tokens.insert(" ".to_string(), 2);
        for (i, ch) in ('a'..='z').enumerate() {
            tokens.insert(ch.to_string(), i + 3);
        }
        Vocabulary::from_map(tokens)
    }

    /// Sums character indices per word; enough to check the plumbing.
    struct IndexSumEmbedder;

    impl WordEmbedder for IndexSumEmbedder {
        fn embed(&self, input: &EncodedInput) -> Result<Vec<f64>> {
            let row = input
                .sample_matrix
                .first()
                .ok_or(EmbedError::EmptySampleMatrix {
                    length: input.length(),
                })?;
            let sum: usize = row
                .iter()
                .zip(input.char_seq.iter())
                .map(|(m, idx)| *m as usize * idx)
                .sum();
            Ok(vec![sum as f64, input.length() as f64])
        }

        fn embedding_dim(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_words_get_trailing_separator() {
        let words = vec!["ab".to_string(), "c".to_string()];
        let embeddings = embed_words(&IndexSumEmbedder, &words, &test_vocab()).unwrap();

        assert_eq!(embeddings.labels, vec!["ab ", "c "]);
        assert_eq!(embeddings.vectors, vec![vec![7.0, 3.0], vec![5.0, 2.0]]);
        assert_eq!(embeddings.shape(), (2, 2));
    }

    #[test]
    fn test_unknown_character_aborts_embedding() {
        let words = vec!["ok".to_string(), "Nope".to_string()];
        let result = embed_words(&IndexSumEmbedder, &words, &test_vocab());
        assert!(matches!(result, Err(EmbedError::UnknownToken { .. })));
    }

    #[test]
    fn test_read_word_list_trims_and_splits() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "\nMarch\nexercise\nJune\n\n").unwrap();

        let words = read_word_list(temp_file.path()).unwrap();
        assert_eq!(words, vec!["March", "exercise", "June"]);
    }

    #[test]
    fn test_missing_word_list_is_distinguished() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_WORD_LIST);
        match read_word_list(&path) {
            Err(EmbedError::WordListMissing(missing)) => assert_eq!(missing, path),
            other => panic!("expected WordListMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_decimator_embedder_returns_hidden_sized_vector() {
        let device = Default::default();
        let decimator = DecimatorConfig::new(32, 8, 5, 1).init::<TestBackend>(&device);
        let embedder = DecimatorEmbedder::new(decimator, device);

        let (_, encoded) = build_input_dict("cab ", &test_vocab()).unwrap();
        let vector = embedder.embed(&encoded).unwrap();
        assert_eq!(vector.len(), embedder.embedding_dim());
        assert!(vector.iter().all(|v| v.is_finite()));

        let (_, no_word) = build_input_dict("cab", &test_vocab()).unwrap();
        assert!(matches!(
            embedder.embed(&no_word),
            Err(EmbedError::EmptySampleMatrix { length: 3 })
        ));
    }
}
