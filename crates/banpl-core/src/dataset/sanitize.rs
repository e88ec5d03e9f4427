//! In-place rewrite of an extracted BAN-PL CSV into the training schema.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer};
use tempfile::NamedTempFile;

use super::version::DatasetVersion;
use crate::error::{BanplError, Result};

/// Outcome of [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Data rows written (header excluded).
    pub rows: usize,
    /// Columns removed from the file.
    pub dropped: Vec<String>,
    /// Header of the rewritten file.
    pub columns: Vec<String>,
}

/// Replace embedded newlines with spaces and trim surrounding whitespace.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Name blank header cells `Unnamed: <index>`, as pandas does when reading
/// a CSV written together with its index.
fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if h.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.to_string()
            }
        })
        .collect()
}

/// Which input columns survive, under which names, and where the text is.
struct ColumnPlan {
    keep: Vec<usize>,
    text_position: usize,
    header: StringRecord,
    dropped: Vec<String>,
}

impl ColumnPlan {
    fn new(headers: &StringRecord, version: DatasetVersion, path: &Path) -> Result<Self> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| BanplError::MissingColumn {
                    column: column.to_string(),
                    path: path.to_path_buf(),
                })
        };

        let mut dropped_idx = Vec::new();
        for column in version.dropped_columns() {
            dropped_idx.push(position(column)?);
        }
        for (from, _) in version.renames() {
            position(from)?;
        }
        let text_idx = position(version.text_column())?;

        let keep: Vec<usize> = (0..headers.len())
            .filter(|i| !dropped_idx.contains(i))
            .collect();
        let text_position = keep
            .iter()
            .position(|&i| i == text_idx)
            .unwrap_or_default();

        let header = keep
            .iter()
            .map(|&i| {
                let name = &headers[i];
                version
                    .renames()
                    .iter()
                    .find(|(from, _)| *from == name)
                    .map_or(name, |(_, to)| *to)
            })
            .collect();

        Ok(Self {
            keep,
            text_position,
            header,
            dropped: version
                .dropped_columns()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        })
    }

    fn apply(&self, record: &StringRecord) -> StringRecord {
        self.keep
            .iter()
            .enumerate()
            .map(|(pos, &i)| {
                let field = record.get(i).unwrap_or_default();
                if pos == self.text_position {
                    clean_text(field)
                } else {
                    field.to_string()
                }
            })
            .collect()
    }
}

/// Rewrite `csv_path` in place for `version`.
///
/// Drops the version's identifier columns, cleans the text column with
/// [`clean_text`] and renames columns to `text`, `labels` (and `reason` for
/// the second release). Other columns and row order are preserved. The new
/// content is staged next to the original and swapped in at the end.
pub fn sanitize(csv_path: &Path, version: DatasetVersion) -> Result<SanitizeReport> {
    if !csv_path.exists() {
        return Err(BanplError::DatasetNotFound {
            path: csv_path.to_path_buf(),
        });
    }

    let mut reader = ReaderBuilder::new().from_path(csv_path)?;
    let headers = normalize_headers(reader.headers()?);
    let plan = ColumnPlan::new(&headers, version, csv_path)?;

    let dir = match csv_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;

    let mut rows = 0usize;
    {
        let mut writer = Writer::from_writer(&mut staged);
        writer.write_record(&plan.header)?;

        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            writer.write_record(&plan.apply(&record))?;
            rows += 1;
        }
        writer.flush()?;
    }

    staged
        .persist(csv_path)
        .map_err(|e| BanplError::Io(e.error))?;

    let report = SanitizeReport {
        rows,
        dropped: plan.dropped,
        columns: plan.header.iter().map(str::to_string).collect(),
    };
    tracing::debug!(
        path = %csv_path.display(),
        rows = report.rows,
        columns = ?report.columns,
        "sanitized {version}"
    );
    Ok(report)
}
