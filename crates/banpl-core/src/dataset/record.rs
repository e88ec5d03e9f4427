use std::fmt;

use serde::{Deserialize, Serialize};

/// Binary moderation label of a BAN-PL row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Label {
    /// 0: the text was not moderated.
    NonHarmful,
    /// 1: the text was removed by moderators.
    Harmful,
}

impl Label {
    pub const ALL: [Self; 2] = [Self::NonHarmful, Self::Harmful];

    /// Class index used by the classifier head.
    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            Self::NonHarmful => 0,
            Self::Harmful => 1,
        }
    }

    /// Inverse of [`Label::index`].
    #[must_use]
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::NonHarmful),
            1 => Some(Self::Harmful),
            _ => None,
        }
    }

    /// Human readable class name, also used as `id2label` in saved models.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NonHarmful => "non-harmful",
            Self::Harmful => "harmful",
        }
    }
}

impl TryFrom<i64> for Label {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(Self::from_index)
            .ok_or_else(|| format!("label must be 0 or 1, got {value}"))
    }
}

impl From<Label> for i64 {
    fn from(label: Label) -> Self {
        i64::from(label.index())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.index())
    }
}

/// One row of a sanitized dataset (`text`, `labels`, optional `reason`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub text: String,
    pub labels: Label,
    /// Pseudonymized moderation reason, present in the second release only.
    #[serde(default)]
    pub reason: Option<String>,
}
