//! Pretrained model resolution: local directories or the Hugging Face hub.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use banpl_core::Label;
use candle_transformers::models::distilbert::Config as DistilBertConfig;
use serde_json::{json, Map, Value};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const SAFETENSORS_FILE: &str = "model.safetensors";
pub const PICKLE_FILE: &str = "pytorch_model.bin";

/// Serialized weights of a pretrained checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsFile {
    SafeTensors(PathBuf),
    /// PyTorch pickle, for checkpoints published before safetensors.
    Pickle(PathBuf),
}

/// Paths of everything needed to build the classifier.
#[derive(Debug, Clone)]
pub struct PretrainedFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: WeightsFile,
}

impl PretrainedFiles {
    /// `model_name` is a local directory if one exists, a hub repo id otherwise.
    pub fn resolve(model_name: &str) -> Result<Self> {
        let local = Path::new(model_name);
        if local.is_dir() {
            Self::from_dir(local)
        } else {
            Self::download(model_name)
        }
    }

    /// Use files already on disk, e.g. the `models/` output of a previous run.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let config = dir.join(CONFIG_FILE);
        let tokenizer = dir.join(TOKENIZER_FILE);
        for required in [&config, &tokenizer] {
            if !required.exists() {
                bail!("Missing {} in model directory", required.display());
            }
        }

        let weights = if dir.join(SAFETENSORS_FILE).exists() {
            WeightsFile::SafeTensors(dir.join(SAFETENSORS_FILE))
        } else if dir.join(PICKLE_FILE).exists() {
            WeightsFile::Pickle(dir.join(PICKLE_FILE))
        } else {
            bail!(
                "No {} or {} in {}",
                SAFETENSORS_FILE,
                PICKLE_FILE,
                dir.display()
            );
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }

    fn download(repo_id: &str) -> Result<Self> {
        tracing::info!("Fetching pretrained model '{}' from the hub", repo_id);
        let api = hf_hub::api::sync::Api::new().context("Failed to create HF API client")?;
        let repo = api.model(repo_id.to_string());

        let config = repo
            .get(CONFIG_FILE)
            .with_context(|| format!("Failed to download {CONFIG_FILE} for {repo_id}"))?;
        let tokenizer = repo
            .get(TOKENIZER_FILE)
            .with_context(|| format!("Failed to download {TOKENIZER_FILE} for {repo_id}"))?;
        let weights = match repo.get(SAFETENSORS_FILE) {
            Ok(path) => WeightsFile::SafeTensors(path),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "No {} for {}, trying {}",
                    SAFETENSORS_FILE,
                    repo_id,
                    PICKLE_FILE
                );
                WeightsFile::Pickle(
                    repo.get(PICKLE_FILE)
                        .with_context(|| format!("Failed to download weights for {repo_id}"))?,
                )
            }
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

/// Parsed `config.json` of a DistilBERT checkpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The document as published, kept so it can be re-saved with labels.
    pub raw: Value,
    pub distilbert: DistilBertConfig,
    /// Hidden size.
    pub dim: usize,
    pub max_position_embeddings: usize,
}

impl ModelConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Self> {
        let distilbert: DistilBertConfig =
            serde_json::from_value(raw.clone()).context("Invalid DistilBERT config")?;
        let field = |name: &str| {
            raw.get(name)
                .and_then(Value::as_u64)
                .map(|v| v as usize)
                .ok_or_else(|| anyhow!("config.json has no integer '{name}'"))
        };
        let dim = field("dim")?;
        let max_position_embeddings = field("max_position_embeddings")?;

        Ok(Self {
            raw,
            distilbert,
            dim,
            max_position_embeddings,
        })
    }

    /// Number of classes recorded by a fine-tuned checkpoint, if any.
    pub fn num_labels(&self) -> Option<usize> {
        self.raw
            .get("num_labels")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .or_else(|| {
                self.raw
                    .get("id2label")
                    .and_then(Value::as_object)
                    .map(Map::len)
            })
    }

    /// The published document extended with the classification head labels.
    pub fn with_labels(&self, num_labels: usize) -> Value {
        let name = |i: usize| {
            u32::try_from(i)
                .ok()
                .and_then(Label::from_index)
                .filter(|_| num_labels == Label::ALL.len())
                .map_or_else(|| format!("LABEL_{i}"), |l| l.name().to_string())
        };

        let mut id2label = Map::new();
        let mut label2id = Map::new();
        for i in 0..num_labels {
            id2label.insert(i.to_string(), json!(name(i)));
            label2id.insert(name(i), json!(i));
        }

        let mut doc = self.raw.clone();
        if let Some(obj) = doc.as_object_mut() {
            obj.insert("num_labels".into(), json!(num_labels));
            obj.insert("id2label".into(), Value::Object(id2label));
            obj.insert("label2id".into(), Value::Object(label2id));
            obj.insert(
                "architectures".into(),
                json!(["DistilBertForSequenceClassification"]),
            );
        }
        doc
    }
}

/// Load a tokenizer that truncates at `max_length` and pads to the longest
/// sequence of each batch.
pub fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Failed to load tokenizer {}: {e}", path.display()))?;

    let pad_token = "[PAD]".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Invalid truncation settings: {e}"))?;
    Ok(tokenizer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn distilbert_config() -> Value {
        json!({
            "activation": "gelu",
            "dim": 32,
            "hidden_dim": 64,
            "initializer_range": 0.02,
            "max_position_embeddings": 64,
            "model_type": "distilbert",
            "n_heads": 2,
            "n_layers": 1,
            "pad_token_id": 0,
            "vocab_size": 100
        })
    }

    #[test]
    fn test_model_config_fields() {
        let config = ModelConfig::from_value(distilbert_config()).expect("config");
        assert_eq!(config.dim, 32);
        assert_eq!(config.max_position_embeddings, 64);
        assert_eq!(config.num_labels(), None);
    }

    #[test]
    fn test_with_labels_uses_label_names() {
        let config = ModelConfig::from_value(distilbert_config()).expect("config");
        let doc = config.with_labels(2);
        assert_eq!(doc["num_labels"], json!(2));
        assert_eq!(doc["id2label"]["1"], json!("harmful"));
        assert_eq!(doc["label2id"]["non-harmful"], json!(0));

        let reloaded = ModelConfig::from_value(doc).expect("reload");
        assert_eq!(reloaded.num_labels(), Some(2));

        let doc = config.with_labels(3);
        assert_eq!(doc["id2label"]["2"], json!("LABEL_2"));
    }

    #[test]
    fn test_from_dir_requires_files() {
        let tmp = TempDir::new().expect("tmp");
        assert!(PretrainedFiles::from_dir(tmp.path()).is_err());

        fs::write(tmp.path().join(CONFIG_FILE), "{}").expect("write");
        fs::write(tmp.path().join(TOKENIZER_FILE), "{}").expect("write");
        assert!(PretrainedFiles::from_dir(tmp.path()).is_err());

        fs::write(tmp.path().join(PICKLE_FILE), "").expect("write");
        let files = PretrainedFiles::from_dir(tmp.path()).expect("files");
        assert_eq!(files.weights, WeightsFile::Pickle(tmp.path().join(PICKLE_FILE)));

        fs::write(tmp.path().join(SAFETENSORS_FILE), "").expect("write");
        let files = PretrainedFiles::from_dir(tmp.path()).expect("files");
        assert!(matches!(files.weights, WeightsFile::SafeTensors(_)));
    }
}
