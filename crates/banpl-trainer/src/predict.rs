//! Inference with a fine-tuned classifier saved by [`crate::trainer::Trainer::save`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use candle_core::{Device, D};
use candle_nn::VarMap;
use serde_json::Value;
use tokenizers::Tokenizer;

use crate::batch::encode_batch;
use crate::model::{build_classifier, DistilBertClassifier};
use crate::pretrained::{load_tokenizer, ModelConfig, PretrainedFiles};

/// Class and softmax confidence for one text.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: u32,
    pub label: String,
    pub confidence: f32,
    pub probabilities: Vec<f32>,
}

pub struct Predictor {
    model: DistilBertClassifier,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
}

impl Predictor {
    /// Load weights, config and tokenizer from `dir` (normally `models/`).
    ///
    /// Every weight, the classification head included, must be present.
    pub fn load(dir: &Path, device: Device) -> Result<Self> {
        let files = PretrainedFiles::from_dir(dir)?;
        let config = ModelConfig::from_file(&files.config)?;
        let Some(num_labels) = config.num_labels() else {
            bail!(
                "{} has no num_labels or id2label, was the model fine-tuned?",
                files.config.display()
            );
        };

        let labels = (0..num_labels)
            .map(|i| {
                config.raw["id2label"]
                    .get(i.to_string())
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("LABEL_{i}"), str::to_string)
            })
            .collect();

        let tokenizer = load_tokenizer(&files.tokenizer, config.max_position_embeddings)?;
        let varmap = VarMap::new();
        let (model, report) = build_classifier(
            &varmap,
            &files.weights,
            &config.distilbert,
            config.dim,
            num_labels,
            0.0,
            &device,
        )
        .with_context(|| format!("Failed to load classifier from {}", dir.display()))?;
        if !report.missing.is_empty() {
            bail!(
                "Checkpoint in {} lacks weights: {}",
                dir.display(),
                report.missing.join(", ")
            );
        }
        tracing::debug!(tensors = report.loaded, "Classifier loaded");

        Ok(Self {
            model,
            tokenizer,
            labels,
            device,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let batch = encode_batch(&self.tokenizer, &[text], &self.device)?;
        let logits = self.model.forward(&batch.input_ids, &batch.pad_mask, false)?;
        let probabilities: Vec<f32> = candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1()?;

        let (index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap_or((0, 0.0));
        let label = self
            .labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{index}"));

        Ok(Prediction {
            index: index as u32,
            label,
            confidence,
            probabilities,
        })
    }
}
