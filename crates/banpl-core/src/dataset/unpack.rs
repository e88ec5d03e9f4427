//! Extraction of one member from a password-protected zip archive.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::NamedTempFile;
use zip::ZipArchive;

use crate::error::{BanplError, Result};

/// Extract `member` from `archive` into `output_dir` under `output_file_name`.
///
/// Each BAN-PL archive holds a single CSV, so extraction and renaming happen
/// in one step: the member is streamed into a temporary file inside
/// `output_dir` and only persisted to the target name once the whole entry
/// has been read and its checksum verified. A wrong password or a missing
/// member therefore leaves `output_dir` as it was.
///
/// Returns the path of the extracted file.
pub fn unpack_and_rename(
    archive: &Path,
    password: &str,
    member: &str,
    output_dir: &Path,
    output_file_name: &str,
) -> Result<PathBuf> {
    let start = Instant::now();
    if !archive.exists() {
        return Err(BanplError::ArchiveMissing {
            path: archive.to_path_buf(),
        });
    }

    let created_dir = !output_dir.exists();
    let target = output_dir.join(output_file_name);
    let result = extract_member(archive, password, member, output_dir, &target);

    if let Err(reason) = result {
        if created_dir {
            // Only removes the directory if nothing else landed in it.
            let _ = fs::remove_dir(output_dir);
        }
        return Err(BanplError::ExtractionFailed {
            archive: archive.to_path_buf(),
            destination: output_dir.to_path_buf(),
            reason,
        });
    }

    tracing::debug!(
        "Unpacked '{}' to '{}' and renamed it to '{}', took {:.2}s",
        archive.display(),
        output_dir.display(),
        output_file_name,
        start.elapsed().as_secs_f64()
    );
    Ok(target)
}

fn extract_member(
    archive: &Path,
    password: &str,
    member: &str,
    output_dir: &Path,
    target: &Path,
) -> std::result::Result<(), String> {
    let file = File::open(archive).map_err(|e| e.to_string())?;
    let mut zip = ZipArchive::new(file).map_err(|e| e.to_string())?;
    let mut entry = zip
        .by_name_decrypt(member, password.as_bytes())
        .map_err(|e| format!("'{member}': {e}"))?;

    fs::create_dir_all(output_dir).map_err(|e| e.to_string())?;
    let mut staged = NamedTempFile::new_in(output_dir).map_err(|e| e.to_string())?;
    io::copy(&mut entry, &mut staged).map_err(|e| format!("'{member}': {e}"))?;

    staged
        .persist(target)
        .map_err(|e| format!("cannot write '{}': {}", target.display(), e.error))?;
    Ok(())
}
