//! Process-wide logging setup.
//!
//! Every entry point calls [`init`] once. Records go to stderr (INFO, or
//! DEBUG with `--verbose`; `RUST_LOG` wins when set) and, always at DEBUG,
//! to a fresh timestamped file such as `logs/train_1717095105.731416.log`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{BanplError, Result};

/// Handle to the log file of the current run.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Path of the file this run logs into.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Build `<script stem>_<unix seconds>.log`, e.g. `train_1717095105.731416.log`.
pub fn log_file_name(script: &str, now: SystemTime) -> String {
    let stem = Path::new(script)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(script);
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    format!("{stem}_{secs:.6}.log")
}

/// Install the global subscriber and open this run's log file in `logs_dir`.
///
/// Fails if a global subscriber is already installed.
pub fn init(script: &str, logs_dir: &Path, verbose: bool) -> Result<RunLog> {
    fs::create_dir_all(logs_dir)?;
    let path = logs_dir.join(log_file_name(script, SystemTime::now()));
    let file = File::create(&path)?;

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        )
        .try_init()
        .map_err(|e| BanplError::Logging(e.to_string()))?;

    tracing::debug!(log_file = %path.display(), "logging initialized");
    Ok(RunLog { path })
}
