use burn::{
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::NmtConfig;
use crate::error::{EmbedError, Result};
use crate::model::{BidirectionalEncoder, EncoderConfig};
use crate::vocab::{Vocabulary, SEPARATOR};

/// Encoder plus everything resolved alongside it at startup.
#[derive(Debug)]
pub struct AssembledModel<B: Backend> {
    pub encoder: BidirectionalEncoder<B>,
    pub src_vocab: Vocabulary,
    pub trg_vocab: Vocabulary,
    /// Decoder start symbol, looked up from `bos_token`
    pub target_bos_idx: usize,
    pub target_space_idx: usize,
}

const CHECKPOINT_EXTENSION: &str = "mpk";

/// File the recorder actually reads or writes for `path`.
pub fn checkpoint_file<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref().with_extension(CHECKPOINT_EXTENSION)
}

/// Save encoder checkpoint to disk
pub fn save_checkpoint<B: Backend, P: AsRef<Path>>(
    encoder: &BidirectionalEncoder<B>,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| EmbedError::io(parent, e))?;
        }
    }

    let record = encoder.clone().into_record();
    CompactRecorder::new()
        .record(record, path.to_path_buf())
        .map_err(|e| EmbedError::Checkpoint(format!("failed to save {}: {:?}", path.display(), e)))?;

    info!(path = %path.display(), "encoder checkpoint saved");
    Ok(())
}

/// Load encoder checkpoint from disk
pub fn load_checkpoint<B: Backend, P: AsRef<Path>>(
    config: &EncoderConfig,
    path: P,
    device: &B::Device,
) -> Result<BidirectionalEncoder<B>> {
    let path = path.as_ref();
    if !checkpoint_file(path).exists() {
        return Err(EmbedError::Checkpoint(format!(
            "no checkpoint at {}",
            checkpoint_file(path).display()
        )));
    }

    let encoder = config.init::<B>(device);
    let record = CompactRecorder::new()
        .load(path.to_path_buf(), device)
        .map_err(|e| EmbedError::Checkpoint(format!("failed to load {}: {:?}", path.display(), e)))?;

    info!(path = %path.display(), "encoder checkpoint loaded");
    Ok(encoder.load_record(record))
}

/// Load both vocabularies, resolve the decoder's special indices and reload
/// the encoder from `config.saveto`.
pub fn assemble<B: Backend>(config: &NmtConfig, device: &B::Device) -> Result<AssembledModel<B>> {
    let src_vocab =
        Vocabulary::load_normalized(&config.src_vocab, config.src_vocab_size, config.unk_id)?;
    let trg_vocab =
        Vocabulary::load_normalized(&config.trg_vocab, config.trg_vocab_size, config.unk_id)?;

    let target_bos_idx = trg_vocab.index_of(&config.bos_token, 0)?;
    let target_space_idx = trg_vocab.char_index(SEPARATOR, 0)?;
    src_vocab.separator_index()?;

    info!(
        src_tokens = src_vocab.len(),
        trg_tokens = trg_vocab.len(),
        target_bos_idx,
        target_space_idx,
        "vocabularies ready"
    );

    let encoder = load_checkpoint::<B, _>(&config.encoder_config(), &config.saveto, device)?;

    Ok(AssembledModel {
        encoder,
        src_vocab,
        trg_vocab,
        target_bos_idx,
        target_space_idx,
    })
}
