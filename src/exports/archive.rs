//! Zip extraction with all-or-nothing semantics.
//!
//! Archives are unpacked into a hidden staging directory next to the
//! destination and only moved into place once every entry was written.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error_handling::DownloadError;

/// Staging directory used while extracting into `dest`: `<parent>/.<name>.partial`.
pub fn staging_dir(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{name}.partial"))
}

/// Extracts `archive` into `dest` and deletes the archive on success.
///
/// On failure `dest` is untouched; the staging directory may remain.
pub async fn extract(archive: &Path, dest: &Path) -> Result<PathBuf, DownloadError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
        .await
        .map_err(std::io::Error::other)?
}

fn extract_blocking(archive: &Path, dest: &Path) -> Result<PathBuf, DownloadError> {
    let corrupt = |reason: String| DownloadError::CorruptArchive {
        archive: archive.display().to_string(),
        reason,
    };

    let staging = staging_dir(dest);
    if staging.exists() {
        log::debug!("Removing stale staging directory {}", staging.display());
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    log::info!("Extracting {} to {}", archive.display(), dest.display());
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;
    let entries = zip.len();
    zip.extract(&staging).map_err(|e| corrupt(e.to_string()))?;

    move_into_place(&staging, dest)?;
    fs::remove_file(archive)?;
    log::info!("Extracted {} entries to {}", entries, dest.display());
    Ok(dest.to_path_buf())
}

/// Renames `staging` to `dest`, or merges its entries when `dest` already exists.
fn move_into_place(staging: &Path, dest: &Path) -> std::io::Result<()> {
    if !dest.exists() {
        return fs::rename(staging, dest);
    }
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if target.is_dir() {
            fs::remove_dir_all(&target)?;
        } else if target.exists() {
            fs::remove_file(&target)?;
        }
        fs::rename(entry.path(), target)?;
    }
    fs::remove_dir(staging)
}
