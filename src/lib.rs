#![recursion_limit = "256"]

//! Word embeddings from a character-level NMT encoder, projected with t-SNE.
//!
//! The pipeline is linear: load the configuration and vocabularies, reload
//! the encoder checkpoint, encode every word of a word list with
//! [`input::build_input_dict`], embed it with the encoder's decimator, project
//! the vectors with [`tsne::fit_transform`] and draw them with
//! [`plotting::plot_word_embedding`].

pub mod checkpoint;
pub mod config;
pub mod embedding;
pub mod error;
pub mod export;
pub mod input;
pub mod model;
pub mod plotting;
pub mod tsne;
pub mod vocab;

pub use error::{EmbedError, Result};
