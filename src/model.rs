use burn::{
    config::Config,
    module::Module,
    nn::{
        gru::{Gru, GruConfig},
        Embedding, EmbeddingConfig,
    },
    tensor::{backend::Backend, Int, Tensor},
};

use crate::input::ModelInput;

/// Character-to-word aggregation network.
#[derive(Config, Debug)]
pub struct DecimatorConfig {
    pub vocab_size: usize,
    pub embed_dim: usize,
    pub hidden_dim: usize,
    pub depth: usize,
}

/// Encoder: decimator followed by a bidirectional word-level GRU stack.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub decimator: DecimatorConfig,
    pub hidden_dim: usize,
    pub depth: usize,
}

/// Embeds characters, runs them through stacked GRUs and pools the hidden
/// states of each word's characters into one vector per word.
#[derive(Module, Debug)]
pub struct Decimator<B: Backend> {
    char_embedding: Embedding<B>,
    layers: Vec<Gru<B>>,
    hidden_dim: usize,
}

#[derive(Module, Debug)]
pub struct BidirectionalEncoder<B: Backend> {
    decimator: Decimator<B>,
    forward_layers: Vec<Gru<B>>,
    backward_layers: Vec<Gru<B>>,
    hidden_dim: usize,
}

impl DecimatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decimator<B> {
        let char_embedding = EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device);

        let mut layers = Vec::with_capacity(self.depth);
        for layer in 0..self.depth {
            let d_input = if layer == 0 { self.embed_dim } else { self.hidden_dim };
            layers.push(GruConfig::new(d_input, self.hidden_dim, true).init(device));
        }

        Decimator {
            char_embedding,
            layers,
            hidden_dim: self.hidden_dim,
        }
    }
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BidirectionalEncoder<B> {
        let decimator = self.decimator.init(device);
        let word_dim = self.decimator.hidden_dim;

        let stack = |device: &B::Device| {
            (0..self.depth)
                .map(|layer| {
                    let d_input = if layer == 0 { word_dim } else { self.hidden_dim };
                    GruConfig::new(d_input, self.hidden_dim, true).init(device)
                })
                .collect::<Vec<_>>()
        };

        BidirectionalEncoder {
            decimator,
            forward_layers: stack(device),
            backward_layers: stack(device),
            hidden_dim: self.hidden_dim,
        }
    }
}

impl<B: Backend> Decimator<B> {
    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Forward pass
    /// Input: char_seq [batch, L], sample_matrix [batch, W, L], char_aux [batch, L]
    /// Output: [batch, W, hidden_dim], the mean hidden state over each word's characters
    pub fn forward(
        &self,
        char_seq: Tensor<B, 2, Int>,
        sample_matrix: Tensor<B, 3, Int>,
        char_aux: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_length] = char_seq.dims();

        let mut hidden = self.char_embedding.forward(char_seq);
        for layer in &self.layers {
            hidden = layer.forward(hidden, None);
        }

        // Separator positions never contribute to a word.
        let aux = char_aux
            .float()
            .reshape([batch_size, seq_length, 1])
            .repeat(&[1, 1, self.hidden_dim]);
        let hidden = hidden * aux;

        let sample = sample_matrix.float();
        let counts = sample
            .clone()
            .sum_dim(2)
            .clamp_min(1.0)
            .repeat(&[1, 1, self.hidden_dim]);

        sample.matmul(hidden) / counts
    }

    pub fn forward_input(&self, input: ModelInput<B>) -> Tensor<B, 3> {
        self.forward(input.char_seq, input.sample_matrix, input.char_aux)
    }
}

impl<B: Backend> BidirectionalEncoder<B> {
    pub fn decimator(&self) -> &Decimator<B> {
        &self.decimator
    }

    pub fn into_decimator(self) -> Decimator<B> {
        self.decimator
    }

    /// Source representation for the decoder.
    /// Output: [batch, W, 2 * hidden_dim], forward states then backward states
    pub fn forward(
        &self,
        char_seq: Tensor<B, 2, Int>,
        sample_matrix: Tensor<B, 3, Int>,
        char_aux: Tensor<B, 2, Int>,
        word_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let words = self.decimator.forward(char_seq, sample_matrix, char_aux);
        let [batch_size, total_word, _] = words.dims();

        let mut forward_states = words.clone();
        for layer in &self.forward_layers {
            forward_states = layer.forward(forward_states, None);
        }

        let mut backward_states = reverse_words(words);
        for layer in &self.backward_layers {
            backward_states = layer.forward(backward_states, None);
        }
        let backward_states = reverse_words(backward_states);

        let mask = word_mask
            .float()
            .reshape([batch_size, total_word, 1])
            .repeat(&[1, 1, 2 * self.hidden_dim]);

        Tensor::cat(vec![forward_states, backward_states], 2) * mask
    }
}

fn reverse_words<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let [_, total_word, _] = x.dims();
    let order: Vec<i32> = (0..total_word as i32).rev().collect();
    let indices = Tensor::<B, 1, Int>::from_ints(order.as_slice(), &x.device());
    x.select(1, indices)
}
