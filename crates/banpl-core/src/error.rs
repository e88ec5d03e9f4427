use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while preparing configuration and datasets.
#[derive(Debug, Error)]
pub enum BanplError {
    /// A configuration document does not exist.
    #[error("configuration file '{}' does not exist, please create it", path.display())]
    ConfigNotFound {
        /// The missing document.
        path: PathBuf,
    },

    /// A configuration document is not valid UTF-8 TOML.
    #[error("failed to parse TOML file at '{}': {reason}", path.display())]
    ConfigInvalid {
        /// The offending document.
        path: PathBuf,
        /// Decoder or parser diagnostic.
        reason: String,
    },

    /// A configuration document exists but cannot be read.
    #[error("failed to load TOML file at '{}': {source}", path.display())]
    ConfigUnreadable {
        /// The offending document.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The custom document names a key the default document does not have.
    #[error(
        "custom key '{key}' not found in default config, cannot overwrite it, please remove it"
    )]
    UnknownConfigKey {
        /// The unrecognized top-level key.
        key: String,
    },

    /// The merged document does not satisfy the training schema.
    #[error("invalid training configuration: {0}")]
    ConfigSchema(String),

    /// The config name given on the command line is not a `.toml` file.
    #[error("config name must end with '.toml' (e.g., 'distilbert.toml'): {0}")]
    InvalidConfigName(String),

    /// A dataset version other than the published BAN-PL releases.
    #[error("unknown dataset version '{0}', expected 1 or 2")]
    UnknownDatasetVersion(String),

    /// The dataset archive is not on disk.
    #[error(
        "archive '{}' does not exist, try running 'git submodule update --init --recursive'",
        path.display()
    )]
    ArchiveMissing {
        /// The missing archive.
        path: PathBuf,
    },

    /// Extracting a member from an archive failed.
    #[error("failed to unpack '{}' to '{}': {reason}", archive.display(), destination.display())]
    ExtractionFailed {
        /// The archive being read.
        archive: PathBuf,
        /// The directory the member was extracted into.
        destination: PathBuf,
        /// Why extraction failed.
        reason: String,
    },

    /// A dataset CSV does not exist.
    #[error("dataset '{}' does not exist", path.display())]
    DatasetNotFound {
        /// The missing dataset file.
        path: PathBuf,
    },

    /// A column required by the sanitizer is absent.
    #[error("column '{column}' not found in '{}'", path.display())]
    MissingColumn {
        /// Name of the missing column.
        column: String,
        /// The dataset being sanitized.
        path: PathBuf,
    },

    /// Malformed CSV content.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Logging could not be initialized.
    #[error("failed to initialize logging: {0}")]
    Logging(String),

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for BAN-PL core operations.
pub type Result<T> = std::result::Result<T, BanplError>;
