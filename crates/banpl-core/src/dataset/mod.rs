//! BAN-PL dataset handling: archive extraction, sanitizing and records.

pub mod record;
pub mod sanitize;
pub mod unpack;
pub mod version;

pub use record::{DatasetRecord, Label};
pub use sanitize::{clean_text, sanitize, SanitizeReport};
pub use unpack::unpack_and_rename;
pub use version::{DatasetVersion, ARCHIVE_MEMBER};

use std::path::PathBuf;

use crate::error::Result;
use crate::layout::ProjectLayout;

/// Extract `version` from `modules/BAN-PL/data/` into `datasets/`.
pub fn unpack_version(layout: &ProjectLayout, version: DatasetVersion) -> Result<PathBuf> {
    unpack_and_rename(
        &layout.archives().join(version.archive_name()),
        version.password(),
        ARCHIVE_MEMBER,
        &layout.datasets,
        version.output_file_name(),
    )
}

/// Extract `version` and rewrite it into the training schema.
pub fn prepare_version(layout: &ProjectLayout, version: DatasetVersion) -> Result<SanitizeReport> {
    let path = unpack_version(layout, version)?;
    sanitize(&path, version)
}
