use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BanplError;

/// Name of the single CSV member inside every BAN-PL archive.
pub const ARCHIVE_MEMBER: &str = "BAN-PL.csv";

/// Published releases of the BAN-PL corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetVersion {
    /// First release, 24,000 rows: `id`, `Text`, `Class`.
    Ban1,
    /// Second release, 24,000 rows: adds a pandas index column and four
    /// pseudonymized moderation reasons in `Reason`.
    Ban2,
}

impl DatasetVersion {
    pub const ALL: [Self; 2] = [Self::Ban1, Self::Ban2];

    /// Archive file name under `modules/BAN-PL/data/`.
    #[must_use]
    pub fn archive_name(self) -> &'static str {
        match self {
            Self::Ban1 => "BAN-PL_1.zip",
            Self::Ban2 => "BAN-PL_2.zip",
        }
    }

    /// Passphrase of the archive (published with the dataset).
    #[must_use]
    pub fn password(self) -> &'static str {
        match self {
            Self::Ban1 => "BAN-PL_1",
            Self::Ban2 => "BAN-PL_2",
        }
    }

    /// File name of the extracted CSV inside `datasets/`.
    #[must_use]
    pub fn output_file_name(self) -> &'static str {
        match self {
            Self::Ban1 => "BAN-PL_1.csv",
            Self::Ban2 => "BAN-PL_2.csv",
        }
    }

    /// Identifier columns that are not usable as model input.
    ///
    /// `id` holds `###` in some rows, which breaks numeric conversion.
    #[must_use]
    pub fn dropped_columns(self) -> &'static [&'static str] {
        match self {
            Self::Ban1 => &["id"],
            Self::Ban2 => &["Unnamed: 0", "id"],
        }
    }

    /// `(source, target)` column renames applied by the sanitizer.
    #[must_use]
    pub fn renames(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Ban1 => &[("Text", "text"), ("Class", "labels")],
            Self::Ban2 => &[("Text", "text"), ("Class", "labels"), ("Reason", "reason")],
        }
    }

    /// Source column holding the free text.
    #[must_use]
    pub fn text_column(self) -> &'static str {
        "Text"
    }
}

impl fmt::Display for DatasetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ban1 => write!(f, "BAN-PL_1"),
            Self::Ban2 => write!(f, "BAN-PL_2"),
        }
    }
}

impl FromStr for DatasetVersion {
    type Err = BanplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1" | "BAN-PL_1" => Ok(Self::Ban1),
            "2" | "BAN-PL_2" => Ok(Self::Ban2),
            _ => Err(BanplError::UnknownDatasetVersion(s.to_string())),
        }
    }
}
