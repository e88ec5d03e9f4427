//! DistilBERT sequence classifier.
//!
//! Same parameter layout as `DistilBertForSequenceClassification`, so a
//! saved `model.safetensors` is interchangeable with hub checkpoints:
//! `distilbert.*`, `pre_classifier.*` and `classifier.*`.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Dropout, Linear, Module, VarBuilder, VarMap};
use candle_transformers::models::distilbert::{Config, DistilBertModel};

use crate::pretrained::WeightsFile;

const BACKBONE_PREFIX: &str = "distilbert.";

pub struct DistilBertClassifier {
    distilbert: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    dropout: Dropout,
    num_labels: usize,
}

impl DistilBertClassifier {
    pub fn load(
        vb: VarBuilder,
        config: &Config,
        dim: usize,
        num_labels: usize,
        dropout: f32,
    ) -> candle_core::Result<Self> {
        let distilbert = DistilBertModel::load(vb.pp("distilbert"), config)?;
        let pre_classifier = candle_nn::linear(dim, dim, vb.pp("pre_classifier"))?;
        let classifier = candle_nn::linear(dim, num_labels, vb.pp("classifier"))?;

        Ok(Self {
            distilbert,
            pre_classifier,
            classifier,
            dropout: Dropout::new(dropout),
            num_labels,
        })
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Logits of shape `[batch, num_labels]`.
    ///
    /// `pad_mask` is `1` at padding positions, shaped `[batch, 1, 1, seq]`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        pad_mask: &Tensor,
        train: bool,
    ) -> candle_core::Result<Tensor> {
        let hidden = self.distilbert.forward(input_ids, pad_mask)?;
        // [CLS] token at position 0
        let pooled = hidden.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&pooled)?.relu()?;
        let pooled = self.dropout.forward(&pooled, train)?;
        self.classifier.forward(&pooled)
    }
}

/// Outcome of copying checkpoint tensors into freshly built variables.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: usize,
    /// Variables the checkpoint had no tensor for; they keep their initial values.
    pub missing: Vec<String>,
}

/// Read every tensor of a checkpoint onto `device`.
pub fn read_weights(weights: &WeightsFile, device: &Device) -> Result<HashMap<String, Tensor>> {
    match weights {
        WeightsFile::SafeTensors(path) => candle_core::safetensors::load(path, device)
            .with_context(|| format!("Failed to read {}", path.display())),
        WeightsFile::Pickle(path) => {
            let tensors = candle_core::pickle::read_all(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            tensors
                .into_iter()
                .map(|(name, t)| Ok((name, t.to_device(device)?)))
                .collect::<Result<HashMap<_, _>>>()
        }
    }
}

/// Checkpoint names a variable may be stored under.
///
/// Base checkpoints omit the `distilbert.` prefix, and older ones name
/// layer norm parameters `gamma`/`beta`.
fn candidate_names(var_name: &str) -> Vec<String> {
    let mut names = vec![var_name.to_string()];
    if let Some(stripped) = var_name.strip_prefix(BACKBONE_PREFIX) {
        names.push(stripped.to_string());
    }
    let legacy: Vec<String> = names
        .iter()
        .filter_map(|n| {
            n.strip_suffix(".weight")
                .map(|base| format!("{base}.gamma"))
                .or_else(|| n.strip_suffix(".bias").map(|base| format!("{base}.beta")))
        })
        .collect();
    names.extend(legacy);
    names
}

/// Overwrite every variable in `varmap` that the checkpoint provides.
pub fn load_pretrained(
    varmap: &VarMap,
    weights: &WeightsFile,
    device: &Device,
) -> Result<LoadReport> {
    let tensors = read_weights(weights, device)?;
    let vars = varmap
        .data()
        .lock()
        .map_err(|e| anyhow!("Variable map lock poisoned: {e}"))?;

    let mut report = LoadReport::default();
    for (name, var) in vars.iter() {
        let found = candidate_names(name)
            .into_iter()
            .find_map(|candidate| tensors.get(&candidate));
        match found {
            Some(tensor) => {
                if tensor.dims() != var.dims() {
                    return Err(anyhow!(
                        "Shape mismatch for '{}': checkpoint {:?}, model {:?}",
                        name,
                        tensor.dims(),
                        var.dims()
                    ));
                }
                var.set(&tensor.to_dtype(DType::F32)?)
                    .with_context(|| format!("Failed to set '{name}'"))?;
                report.loaded += 1;
            }
            None => report.missing.push(name.clone()),
        }
    }
    report.missing.sort();

    tracing::debug!(
        loaded = report.loaded,
        missing = report.missing.len(),
        "Copied pretrained tensors"
    );
    Ok(report)
}

/// Build a classifier whose variables live in `varmap`, then fill them from
/// `weights`.
pub fn build_classifier(
    varmap: &VarMap,
    weights: &WeightsFile,
    config: &Config,
    dim: usize,
    num_labels: usize,
    dropout: f32,
    device: &Device,
) -> Result<(DistilBertClassifier, LoadReport)> {
    let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
    let model = DistilBertClassifier::load(vb, config, dim, num_labels, dropout)
        .context("Failed to build DistilBERT classifier")?;
    let report = load_pretrained(varmap, weights, device)?;
    Ok((model, report))
}
