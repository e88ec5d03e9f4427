//! Configuration loading and merging
//!
//! A run is configured by `configs/default.toml` overwritten key by key with
//! a custom document named on the command line. Custom keys must exist in
//! the default document; the merged result is then checked against
//! [`TrainConfig`].

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_tables};
pub use schema::{DeviceKind, TrainConfig};

use crate::error::{BanplError, Result};

/// Extension every config name must carry.
pub const CONFIG_EXTENSION: &str = ".toml";

/// Accept only config names ending in `.toml` (e.g. `distilbert.toml`).
///
/// Usable directly as a clap `value_parser`.
pub fn validate_config_name(name: &str) -> Result<String> {
    if name.ends_with(CONFIG_EXTENSION) && name.len() > CONFIG_EXTENSION.len() {
        Ok(name.to_string())
    } else {
        Err(BanplError::InvalidConfigName(name.to_string()))
    }
}
