use serde::{Deserialize, Serialize};
use toml::Table;

use super::loader::load_config;
use super::validate_config_name;
use crate::error::{BanplError, Result};
use crate::layout::ProjectLayout;

/// Where tensors live during training and prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// CUDA device 0 when available, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// Typed view of the merged training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    /// Sanitized CSV inside `datasets/`.
    pub dataset: String,
    /// Fraction of rows kept before splitting, in `(0, 1]`.
    pub sample_fraction: f64,
    /// Share of rows held out for evaluation, in `(0, 1)`.
    pub test_size: f64,
    pub seed: u64,
    /// Hub repository id or local directory of the pretrained model.
    pub model_name: String,
    pub num_labels: usize,
    /// Tokenizer truncation length.
    pub max_length: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub train_batch_size: usize,
    pub eval_batch_size: usize,
    pub epochs: usize,
    pub gradient_accumulation_steps: usize,
    /// Optimizer steps between loss records.
    pub logging_steps: usize,
    /// Dropout applied before the classification layer.
    pub dropout: f32,
    #[serde(default)]
    pub device: DeviceKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset: "BAN-PL_1.csv".to_string(),
            sample_fraction: 1.0,
            test_size: 0.2,
            seed: 42,
            model_name: "Geotrend/distilbert-base-pl-cased".to_string(),
            num_labels: 2,
            max_length: 512,
            learning_rate: 5e-5,
            weight_decay: 0.01,
            train_batch_size: 32,
            eval_batch_size: 32,
            epochs: 1,
            gradient_accumulation_steps: 2,
            logging_steps: 1,
            dropout: 0.2,
            device: DeviceKind::Auto,
        }
    }
}

impl TrainConfig {
    /// Merge `configs/default.toml` with `configs/<name>` and validate the result.
    pub fn load(layout: &ProjectLayout, name: &str) -> Result<Self> {
        let name = validate_config_name(name)?;
        let merged = load_config(&layout.default_config(), &layout.config(&name))?;
        Self::from_table(merged)
    }

    /// Deserialize and range-check a merged document.
    pub fn from_table(table: Table) -> Result<Self> {
        let config: Self = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| BanplError::ConfigSchema(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(BanplError::ConfigSchema(msg));

        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return fail(format!(
                "sample_fraction must be in (0, 1], got {}",
                self.sample_fraction
            ));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return fail(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            ));
        }
        if self.num_labels < 2 {
            return fail(format!(
                "num_labels must be at least 2, got {}",
                self.num_labels
            ));
        }
        if self.learning_rate <= 0.0 {
            return fail(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.weight_decay < 0.0 {
            return fail(format!(
                "weight_decay must not be negative, got {}",
                self.weight_decay
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return fail(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            ));
        }
        for (key, value) in [
            ("max_length", self.max_length),
            ("train_batch_size", self.train_batch_size),
            ("eval_batch_size", self.eval_batch_size),
            ("epochs", self.epochs),
            ("gradient_accumulation_steps", self.gradient_accumulation_steps),
            ("logging_steps", self.logging_steps),
        ] {
            if value == 0 {
                return fail(format!("{key} must be at least 1"));
            }
        }
        if self.dataset.trim().is_empty() || self.model_name.trim().is_empty() {
            return fail("dataset and model_name must not be empty".to_string());
        }
        Ok(())
    }
}
