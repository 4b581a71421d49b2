use burn::tensor::{backend::Backend, Int, Tensor};

use crate::error::Result;
use crate::vocab::Vocabulary;

/// Character-level encoding of one input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    /// Vocabulary index of every character
    pub char_seq: Vec<usize>,
    /// One row per separator-terminated word, 1 on that word's characters
    pub sample_matrix: Vec<Vec<u8>>,
    /// 0 on separator positions, 1 elsewhere
    pub char_aux: Vec<u8>,
}

/// Encoded input as model tensors, each with a leading batch dimension of 1.
#[derive(Clone, Debug)]
pub struct ModelInput<B: Backend> {
    pub char_seq: Tensor<B, 2, Int>,
    pub sample_matrix: Tensor<B, 3, Int>,
    pub char_aux: Tensor<B, 2, Int>,
}

/// Encode `input` against `vocab`, returning its character length and arrays.
///
/// A word is only captured when a separator follows it, so callers append a
/// trailing space to every word. Without it the last word gets no row in the
/// sample matrix.
pub fn build_input_dict(input: &str, vocab: &Vocabulary) -> Result<(usize, EncodedInput)> {
    let char_seq = input
        .chars()
        .enumerate()
        .map(|(position, ch)| vocab.char_index(ch, position))
        .collect::<Result<Vec<usize>>>()?;
    let input_length = char_seq.len();

    let separator = vocab.separator_index()?;
    let space_positions: Vec<usize> = char_seq
        .iter()
        .enumerate()
        .filter(|(_, idx)| **idx == separator)
        .map(|(position, _)| position)
        .collect();
    let total_word = space_positions.len();

    let mut sample_matrix = vec![vec![0u8; input_length]; total_word];
    let mut start = 0;
    for (row, &space) in sample_matrix.iter_mut().zip(space_positions.iter()) {
        row[start..space].fill(1);
        start = space + 1;
    }

    let char_aux = char_seq
        .iter()
        .map(|idx| if *idx == separator { 0 } else { 1 })
        .collect();

    Ok((
        input_length,
        EncodedInput {
            char_seq,
            sample_matrix,
            char_aux,
        },
    ))
}

impl EncodedInput {
    pub fn length(&self) -> usize {
        self.char_seq.len()
    }

    pub fn total_words(&self) -> usize {
        self.sample_matrix.len()
    }

    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> ModelInput<B> {
        let length = self.length();
        let total_word = self.total_words();

        let char_seq: Vec<i32> = self.char_seq.iter().map(|&idx| idx as i32).collect();
        let sample: Vec<i32> = self
            .sample_matrix
            .iter()
            .flat_map(|row| row.iter().map(|&v| v as i32))
            .collect();
        let aux: Vec<i32> = self.char_aux.iter().map(|&v| v as i32).collect();

        ModelInput {
            char_seq: Tensor::<B, 1, Int>::from_ints(char_seq.as_slice(), device)
                .reshape([1, length]),
            sample_matrix: Tensor::<B, 1, Int>::from_ints(sample.as_slice(), device)
                .reshape([1, total_word, length]),
            char_aux: Tensor::<B, 1, Int>::from_ints(aux.as_slice(), device)
                .reshape([1, length]),
        }
    }

    /// All-ones word mask `[1, total_words]` for the word-level encoder.
    pub fn word_mask<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2, Int> {
        let total_word = self.total_words();
        let ones = vec![1i32; total_word];
        Tensor::<B, 1, Int>::from_ints(ones.as_slice(), device).reshape([1, total_word])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbedError;
    use burn::backend::NdArray;
    use std::collections::HashMap;

    type TestBackend = NdArray;

    fn test_vocab() -> Vocabulary {
        let tokens: HashMap<String, usize> = [(" ", 0), ("a", 2), ("b", 3), ("c", 4), ("d", 5)]
            .iter()
            .map(|(token, idx)| (token.to_string(), *idx))
            .collect();
        Vocabulary::from_map(tokens)
    }

    #[test]
    fn test_two_words_with_trailing_space() {
        let (length, encoded) = build_input_dict("ab cd ", &test_vocab()).unwrap();

        assert_eq!(length, 6);
        assert_eq!(encoded.char_seq, vec![2, 3, 0, 4, 5, 0]);
        assert_eq!(encoded.total_words(), 2);
        assert_eq!(
            encoded.sample_matrix,
            vec![vec![1, 1, 0, 0, 0, 0], vec![0, 0, 0, 1, 1, 0]]
        );
        assert_eq!(encoded.char_aux, vec![1, 1, 0, 1, 1, 0]);
    }

    #[test]
    fn test_missing_trailing_space_drops_last_word() {
        // Only the separator-terminated "ab" gets a row; "cd" is not captured.
        let (length, encoded) = build_input_dict("ab cd", &test_vocab()).unwrap();

        assert_eq!(length, 5);
        assert_eq!(encoded.total_words(), 1);
        assert_eq!(encoded.sample_matrix, vec![vec![1, 1, 0, 0, 0]]);
        assert_eq!(encoded.char_aux, vec![1, 1, 0, 1, 1]);
    }

    #[test]
    fn test_no_separator_gives_zero_rows() {
        let (length, encoded) = build_input_dict("abcd", &test_vocab()).unwrap();

        assert_eq!(length, 4);
        assert!(encoded.sample_matrix.is_empty());
        assert_eq!(encoded.char_aux, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_rows_partition_non_space_positions() {
        let input = "abc d ca dd ";
        let (length, encoded) = build_input_dict(input, &test_vocab()).unwrap();
        let spaces = input.chars().filter(|c| *c == ' ').count();

        assert_eq!(encoded.total_words(), spaces);
        let total: usize = encoded
            .sample_matrix
            .iter()
            .map(|row| row.iter().map(|&v| v as usize).sum::<usize>())
            .sum();
        assert_eq!(total, length - spaces);

        let mut previous_end = 0;
        for row in &encoded.sample_matrix {
            assert_eq!(row.len(), length);
            let ones: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, v)| **v == 1)
                .map(|(i, _)| i)
                .collect();
            let first = ones[0];
            let last = *ones.last().unwrap();
            assert_eq!(ones.len(), last - first + 1, "row must be contiguous");
            assert!(first >= previous_end, "rows must be ordered and disjoint");
            previous_end = last + 1;
        }
    }

    #[test]
    fn test_consecutive_spaces_give_empty_row() {
        let (_, encoded) = build_input_dict("a  ", &test_vocab()).unwrap();
        assert_eq!(encoded.sample_matrix, vec![vec![1, 0, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let result = build_input_dict("abz ", &test_vocab());
        match result {
            Err(EmbedError::UnknownToken { token, position }) => {
                assert_eq!(token, "z");
                assert_eq!(position, 2);
            }
            other => panic!("expected UnknownToken, got {other:?}"),
        }
    }

    #[test]
    fn test_tensors_carry_batch_dimension() {
        let device = Default::default();
        let (_, encoded) = build_input_dict("ab cd ", &test_vocab()).unwrap();
        let input = encoded.to_tensors::<TestBackend>(&device);

        assert_eq!(input.char_seq.dims(), [1, 6]);
        assert_eq!(input.sample_matrix.dims(), [1, 2, 6]);
        assert_eq!(input.char_aux.dims(), [1, 6]);
        assert_eq!(encoded.word_mask::<TestBackend>(&device).dims(), [1, 2]);

        let sample: Vec<i64> = input
            .sample_matrix
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap();
        assert_eq!(sample, vec![1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0]);
    }
}
