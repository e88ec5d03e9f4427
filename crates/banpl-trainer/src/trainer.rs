//! Fine-tuning loop for the DistilBERT classifier.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use banpl_core::{DatasetRecord, DeviceKind, ProjectLayout, TrainConfig};
use candle_core::backprop::GradStore;
use candle_core::{Device, Tensor, Var, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use serde::Serialize;
use tokenizers::Tokenizer;

use crate::batch::{encode_batch, label_tensor};
use crate::data::{self, DataSplit};
use crate::metrics::{compute_metrics, ClassificationMetrics};
use crate::model::{build_classifier, DistilBertClassifier};
use crate::pretrained::{
    load_tokenizer, ModelConfig, PretrainedFiles, CONFIG_FILE, SAFETENSORS_FILE, TOKENIZER_FILE,
};

/// Copy of the merged configuration saved next to the weights.
pub const TRAINING_ARGS_FILE: &str = "training_args.json";

/// Final evaluation of a run, written as JSON next to the weights.
pub const EVAL_RESULTS_FILE: &str = "eval_results.json";

/// What a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub optimizer_steps: usize,
    pub eval_loss: f64,
    pub metrics: ClassificationMetrics,
    pub output_dir: PathBuf,
}

pub fn select_device(kind: DeviceKind) -> Result<Device> {
    let device = match kind {
        DeviceKind::Auto => Device::cuda_if_available(0)?,
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Cuda => Device::new_cuda(0).context("CUDA device requested but unavailable")?,
    };
    tracing::info!("Using device: {:?}", device);
    Ok(device)
}

/// Linear decay from `base` to zero over `total` optimizer steps.
pub fn linear_decay(base: f64, step: usize, total: usize) -> f64 {
    if total == 0 {
        return base;
    }
    base * total.saturating_sub(step) as f64 / total as f64
}

/// Add `grads` into `acc`, variable by variable.
fn accumulate(acc: &mut Option<GradStore>, grads: GradStore, vars: &[Var]) -> Result<()> {
    if let Some(total) = acc.as_mut() {
        for var in vars {
            let Some(grad) = grads.get(var.as_tensor()) else {
                continue;
            };
            let sum = match total.remove(var.as_tensor()) {
                Some(prev) => (prev + grad)?,
                None => grad.clone(),
            };
            total.insert(var.as_tensor(), sum);
        }
    } else {
        *acc = Some(grads);
    }
    Ok(())
}

pub struct Trainer {
    config: TrainConfig,
    device: Device,
    varmap: VarMap,
    model: DistilBertClassifier,
    model_config: ModelConfig,
    tokenizer: Tokenizer,
}

impl Trainer {
    /// Build the classifier from the pretrained checkpoint `files`.
    pub fn new(config: TrainConfig, files: &PretrainedFiles, device: Device) -> Result<Self> {
        let model_config = ModelConfig::from_file(&files.config)?;
        let max_length = config.max_length.min(model_config.max_position_embeddings);
        if max_length < config.max_length {
            tracing::warn!(
                "max_length {} exceeds the model's {} positions, truncating at {}",
                config.max_length,
                model_config.max_position_embeddings,
                max_length
            );
        }
        let tokenizer = load_tokenizer(&files.tokenizer, max_length)?;

        let varmap = VarMap::new();
        let (model, report) = build_classifier(
            &varmap,
            &files.weights,
            &model_config.distilbert,
            model_config.dim,
            config.num_labels,
            config.dropout,
            &device,
        )?;
        tracing::info!("Loaded {} pretrained tensors", report.loaded);
        if !report.missing.is_empty() {
            tracing::info!(
                "Newly initialized weights (not in checkpoint): {}",
                report.missing.join(", ")
            );
        }

        Ok(Self {
            config,
            device,
            varmap,
            model,
            model_config,
            tokenizer,
        })
    }

    fn logits(&self, records: &[&DatasetRecord], train: bool) -> Result<(Tensor, Tensor)> {
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let labels: Vec<u32> = records.iter().map(|r| r.labels.index()).collect();
        let batch = encode_batch(&self.tokenizer, &texts, &self.device)?;
        let logits = self.model.forward(&batch.input_ids, &batch.pad_mask, train)?;
        Ok((logits, label_tensor(&labels, &self.device)?))
    }

    /// Run every epoch over `split.train`, evaluating on `split.test` after each.
    pub fn train(&self, split: &DataSplit) -> Result<(usize, f64, ClassificationMetrics)> {
        let cfg = self.config.clone();
        let vars = self.varmap.all_vars();
        let mut optimizer = AdamW::new(
            vars.clone(),
            ParamsAdamW {
                lr: cfg.learning_rate,
                weight_decay: cfg.weight_decay,
                ..Default::default()
            },
        )?;

        let batches_per_epoch = split.train.len().div_ceil(cfg.train_batch_size);
        let steps_per_epoch = batches_per_epoch.div_ceil(cfg.gradient_accumulation_steps);
        let total_steps = steps_per_epoch * cfg.epochs;
        tracing::info!(
            "Training: {} epochs, {} batches/epoch, {} optimizer steps, lr={}, wd={}",
            cfg.epochs,
            batches_per_epoch,
            total_steps,
            cfg.learning_rate,
            cfg.weight_decay
        );

        let mut step = 0usize;
        let mut window_loss = 0.0f64;
        let mut window_batches = 0usize;
        let mut last_eval = (0.0, ClassificationMetrics::default());

        for epoch in 0..cfg.epochs {
            let started = Instant::now();
            let order = data::epoch_order(split.train.len(), cfg.seed, epoch);
            let mut pending: Option<GradStore> = None;

            for (i, chunk) in order.chunks(cfg.train_batch_size).enumerate() {
                let records: Vec<&DatasetRecord> = chunk.iter().map(|&j| &split.train[j]).collect();
                let (logits, labels) = self.logits(&records, true)?;
                let loss = candle_nn::loss::cross_entropy(&logits, &labels)?;
                window_loss += f64::from(loss.to_scalar::<f32>()?);
                window_batches += 1;

                let scaled = (loss / cfg.gradient_accumulation_steps as f64)?;
                accumulate(&mut pending, scaled.backward()?, &vars)?;

                let boundary = (i + 1) % cfg.gradient_accumulation_steps == 0
                    || i + 1 == batches_per_epoch;
                if !boundary {
                    continue;
                }
                let Some(grads) = pending.take() else {
                    continue;
                };

                let lr = linear_decay(cfg.learning_rate, step, total_steps);
                optimizer.set_learning_rate(lr);
                optimizer.step(&grads)?;
                step += 1;

                if step % cfg.logging_steps == 0 {
                    tracing::info!(
                        "step {}/{} | epoch {:.2} | loss={:.4} | lr={:.3e}",
                        step,
                        total_steps,
                        epoch as f64 + (i + 1) as f64 / batches_per_epoch as f64,
                        window_loss / window_batches as f64,
                        lr
                    );
                    window_loss = 0.0;
                    window_batches = 0;
                }
            }

            let (eval_loss, metrics) = self.evaluate(&split.test)?;
            tracing::info!(
                "Epoch {}/{} done in {:.1}s | eval_loss={:.4} | {}",
                epoch + 1,
                cfg.epochs,
                started.elapsed().as_secs_f64(),
                eval_loss,
                metrics
            );
            last_eval = (eval_loss, metrics);
        }

        Ok((step, last_eval.0, last_eval.1))
    }

    /// Mean cross-entropy and binary metrics over `records`.
    pub fn evaluate(&self, records: &[DatasetRecord]) -> Result<(f64, ClassificationMetrics)> {
        let mut predictions = Vec::with_capacity(records.len());
        let mut labels = Vec::with_capacity(records.len());
        let mut loss_sum = 0.0f64;

        for chunk in records.chunks(self.config.eval_batch_size) {
            let refs: Vec<&DatasetRecord> = chunk.iter().collect();
            let (logits, label_t) = self.logits(&refs, false)?;
            let loss = candle_nn::loss::cross_entropy(&logits, &label_t)?;
            loss_sum += f64::from(loss.to_scalar::<f32>()?) * chunk.len() as f64;

            predictions.extend(logits.argmax(D::Minus1)?.to_vec1::<u32>()?);
            labels.extend(chunk.iter().map(|r| r.labels.index()));
        }

        let eval_loss = if records.is_empty() {
            0.0
        } else {
            loss_sum / records.len() as f64
        };
        Ok((eval_loss, compute_metrics(&predictions, &labels)))
    }

    /// Write weights, labelled config, tokenizer and training arguments to `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        self.varmap
            .save(dir.join(SAFETENSORS_FILE))
            .context("Failed to save model weights")?;

        let config = self.model_config.with_labels(self.config.num_labels);
        fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(&config)?)?;

        self.tokenizer
            .save(dir.join(TOKENIZER_FILE), true)
            .map_err(|e| anyhow!("Failed to save tokenizer: {e}"))?;

        fs::write(
            dir.join(TRAINING_ARGS_FILE),
            serde_json::to_string_pretty(&self.config)?,
        )?;

        tracing::info!("Model saved to {}", dir.display());
        Ok(())
    }
}

/// Resolve `model_name` against the project root first, then the hub.
fn resolve_pretrained(layout: &ProjectLayout, model_name: &str) -> Result<PretrainedFiles> {
    let local = layout.root.join(model_name);
    if local.is_dir() {
        PretrainedFiles::from_dir(&local)
    } else {
        PretrainedFiles::resolve(model_name)
    }
}

/// Load, sample and split the dataset named by `config`.
pub fn prepare_split(layout: &ProjectLayout, config: &TrainConfig) -> Result<DataSplit> {
    let path = layout.dataset(&config.dataset);
    let records = data::load_records(&path)?;
    tracing::info!("Original dataset size: {}", records.len());

    let records = data::sample(records, config.sample_fraction, config.seed);
    tracing::info!("Reduced dataset size: {}", records.len());

    let split = data::train_test_split(records, config.test_size, config.seed)?;
    tracing::info!(
        "Training set size: {}, Test set size: {}",
        split.train.len(),
        split.test.len()
    );
    Ok(split)
}

/// Full pipeline: data, pretrained model, fine-tuning, evaluation, save.
pub fn run_training(layout: &ProjectLayout, config: &TrainConfig) -> Result<TrainingSummary> {
    let split = prepare_split(layout, config)?;
    let device = select_device(config.device)?;
    let files = resolve_pretrained(layout, &config.model_name)?;

    let trainer = Trainer::new(config.clone(), &files, device)?;
    let (optimizer_steps, eval_loss, metrics) = trainer.train(&split)?;
    trainer.save(&layout.models)?;

    let summary = TrainingSummary {
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        optimizer_steps,
        eval_loss,
        metrics,
        output_dir: layout.models.clone(),
    };
    fs::write(
        layout.models.join(EVAL_RESULTS_FILE),
        serde_json::to_string_pretty(&summary)?,
    )?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_decay() {
        assert_eq!(linear_decay(1e-4, 0, 10), 1e-4);
        assert!((linear_decay(1e-4, 5, 10) - 5e-5).abs() < 1e-12);
        assert_eq!(linear_decay(1e-4, 10, 10), 0.0);
        assert_eq!(linear_decay(1e-4, 12, 10), 0.0);
        assert_eq!(linear_decay(1e-4, 0, 0), 1e-4);
    }

    #[test]
    fn test_accumulate_sums_gradients() {
        let device = Device::Cpu;
        let w = Var::new(&[1.0f32, 2.0], &device).expect("var");
        let vars = vec![w.clone()];

        let mut acc = None;
        for scale in [1.0, 3.0] {
            let loss = (w.as_tensor() * scale)
                .and_then(|t| t.sum_all())
                .expect("loss");
            accumulate(&mut acc, loss.backward().expect("grads"), &vars).expect("accumulate");
        }

        let grads = acc.expect("grads");
        let g: Vec<f32> = grads
            .get(w.as_tensor())
            .expect("grad")
            .to_vec1()
            .expect("vec");
        assert_eq!(g, vec![4.0, 4.0]);
    }

    #[test]
    fn test_select_cpu() {
        assert!(matches!(select_device(DeviceKind::Cpu), Ok(Device::Cpu)));
    }
}
