//! # BAN-PL Trainer
//!
//! Fine-tunes a pretrained DistilBERT on the sanitized BAN-PL dataset and
//! serves predictions from the saved checkpoint. Configuration, paths and
//! logging come from `banpl-core`; tensors and optimization from candle.

pub mod batch;
pub mod data;
pub mod metrics;
pub mod model;
pub mod predict;
pub mod pretrained;
pub mod trainer;

pub use metrics::{compute_metrics, ClassificationMetrics};
pub use predict::{Prediction, Predictor};
pub use trainer::{run_training, select_device, Trainer, TrainingSummary};
