//! Error types shared by the embedding pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, encoding, embedding or projecting words.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// A character (or reserved token) has no vocabulary entry.
    #[error("token {token:?} at position {position} is not in the vocabulary")]
    UnknownToken {
        /// The missing token
        token: String,
        /// Character position inside the encoded string
        position: usize,
    },

    /// The word list file does not exist.
    #[error("word list not found: {}", .0.display())]
    WordListMissing(PathBuf),

    /// Any other filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration rejected before model construction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Checkpoint could not be read or written.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// The encoded input has no word segment to embed.
    #[error("input of length {length} has no separator-terminated word")]
    EmptySampleMatrix { length: usize },

    /// Tensor data could not be read back from the backend.
    #[error("tensor error: {0}")]
    Tensor(String),

    /// Dimensionality reduction could not run on the given vectors.
    #[error("projection error: {0}")]
    Projection(String),
}

impl EmbedError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EmbedError>;
