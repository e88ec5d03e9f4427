//! # BAN-PL Core
//!
//! Everything the BAN-PL hate-speech classifier needs before a tensor is
//! touched: the project directory layout, logging setup, the strict
//! default/custom config merger and the dataset unpacker and sanitizer.
//!
//! ## Quick Start
//!
//! ```rust
//! use banpl_core::config::merge_tables;
//!
//! let default: toml::Table = "brand = \"Nissan\"\nmodel = \"180SX\"".parse().unwrap();
//! let custom: toml::Table = "model = \"Silvia S15\"".parse().unwrap();
//!
//! let merged = merge_tables(default, custom).unwrap();
//! assert_eq!(merged["model"].as_str(), Some("Silvia S15"));
//! assert_eq!(merged["brand"].as_str(), Some("Nissan"));
//! ```
pub mod config;
pub mod dataset;
pub mod error;
pub mod layout;
pub mod logging;

// Re-export primary API
pub use config::{load_config, merge_tables, validate_config_name, DeviceKind, TrainConfig};
pub use dataset::{
    clean_text, prepare_version, sanitize, unpack_and_rename, unpack_version, DatasetRecord,
    DatasetVersion, Label, SanitizeReport,
};
pub use error::{BanplError, Result};
pub use layout::ProjectLayout;
pub use logging::RunLog;
