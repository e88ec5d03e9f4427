//! Turning text into model inputs.

use anyhow::{anyhow, bail, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Tokenized, padded batch ready for [`crate::model::DistilBertClassifier::forward`].
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    /// `[batch, seq]`, `u32`.
    pub input_ids: Tensor,
    /// `[batch, 1, 1, seq]`, `u8`, `1` marks padding.
    pub pad_mask: Tensor,
}

pub fn encode_batch(
    tokenizer: &Tokenizer,
    texts: &[&str],
    device: &Device,
) -> Result<EncodedBatch> {
    if texts.is_empty() {
        bail!("Cannot encode an empty batch");
    }

    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {e}"))?;

    let batch = encodings.len();
    let seq = encodings.iter().map(|e| e.len()).max().unwrap_or(0);
    let mut ids = Vec::with_capacity(batch * seq);
    let mut mask = Vec::with_capacity(batch * seq);
    for encoding in &encodings {
        let pad = seq - encoding.len();
        ids.extend_from_slice(encoding.get_ids());
        ids.extend(std::iter::repeat_n(0u32, pad));
        mask.extend(encoding.get_attention_mask().iter().map(|&m| u8::from(m == 0)));
        mask.extend(std::iter::repeat_n(1u8, pad));
    }

    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, (batch, seq), device)?,
        pad_mask: Tensor::from_vec(mask, (batch, 1, 1, seq), device)?,
    })
}

/// Label indices as a `u32` tensor for `cross_entropy`.
pub fn label_tensor(labels: &[u32], device: &Device) -> Result<Tensor> {
    Ok(Tensor::new(labels, device)?)
}
