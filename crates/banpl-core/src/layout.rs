//! Project directory layout.
//!
//! ```text
//! .
//! ├── configs     default.toml + per-run overrides
//! ├── datasets    sanitized CSV files
//! ├── logs        one timestamped log per run
//! ├── models      trained weights, config and tokenizer
//! └── modules     git submodules (BAN-PL archives)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File name of the default configuration inside `configs/`.
pub const DEFAULT_CONFIG: &str = "default.toml";

/// Absolute-or-relative paths of every directory the pipeline touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub configs: PathBuf,
    pub datasets: PathBuf,
    pub logs: PathBuf,
    pub models: PathBuf,
    pub modules: PathBuf,
}

impl ProjectLayout {
    /// Build the layout rooted at `root`. Nothing is created on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            configs: root.join("configs"),
            datasets: root.join("datasets"),
            logs: root.join("logs"),
            models: root.join("models"),
            modules: root.join("modules"),
            root,
        }
    }

    /// Recursively create every output directory that is missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.configs,
            &self.datasets,
            &self.logs,
            &self.models,
            &self.modules,
        ] {
            fs::create_dir_all(dir)?;
        }
        tracing::debug!(root = %self.root.display(), "project directories ready");
        Ok(())
    }

    /// `configs/default.toml`
    pub fn default_config(&self) -> PathBuf {
        self.configs.join(DEFAULT_CONFIG)
    }

    /// `configs/<name>`
    pub fn config(&self, name: &str) -> PathBuf {
        self.configs.join(name)
    }

    /// Directory holding the BAN-PL `.zip` archives.
    pub fn archives(&self) -> PathBuf {
        self.modules.join("BAN-PL").join("data")
    }

    /// `datasets/<file_name>`
    pub fn dataset(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.datasets.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = ProjectLayout::new("/srv/banpl");
        assert_eq!(layout.default_config(), PathBuf::from("/srv/banpl/configs/default.toml"));
        assert_eq!(layout.config("bert.toml"), PathBuf::from("/srv/banpl/configs/bert.toml"));
        assert_eq!(
            layout.archives(),
            PathBuf::from("/srv/banpl/modules/BAN-PL/data")
        );
        assert_eq!(
            layout.dataset("BAN-PL_1.csv"),
            PathBuf::from("/srv/banpl/datasets/BAN-PL_1.csv")
        );
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() {
        let tmp = TempDir::new().expect("tmp");
        let layout = ProjectLayout::new(tmp.path());
        layout.ensure_dirs().expect("first");
        layout.ensure_dirs().expect("second");
        for dir in [
            &layout.configs,
            &layout.datasets,
            &layout.logs,
            &layout.models,
            &layout.modules,
        ] {
            assert!(dir.is_dir(), "{} should exist", dir.display());
        }
    }
}
