//! Table of contents (manifest) of a data directory.
//!
//! The manifest lists every regular file of a data record, one absolute path
//! per line, sorted. Consumers read the manifest instead of listing the
//! directory, which lets a linked external file be referenced by a single
//! manifest entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::StorageError;

use super::layout::ensure_directory;

/// Result of a manifest rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    pub manifest_path: PathBuf,
    /// Sorted absolute file paths, exactly as written to the manifest.
    pub files: Vec<String>,
    /// Sum of the sizes of the listed files that still exist.
    pub size: u64,
    pub file_count: usize,
}

/// Writes `content` to a sibling temp file and renames it over `path`, so
/// readers never observe a half-written manifest.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, content).map_err(|e| StorageError::WriteFile {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| StorageError::MoveFile {
        from: tmp_path.clone(),
        to: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Lists the regular files under `data_dir`, following symlinks, sorted as
/// strings.
fn collect_files(data_dir: &Path) -> Vec<String> {
    let root = std::path::absolute(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
    if !root.is_dir() {
        warn!("Data directory {} does not exist", root.display());
    }

    let mut files: Vec<String> = WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect();

    files.sort();
    files
}

/// Rebuilds the manifest of `data_dir` at `manifest_path`.
///
/// Files that vanish between the walk and the size computation are left out
/// of the size sum; they are not an error.
pub fn build(data_dir: &Path, manifest_path: &Path) -> Result<Toc, StorageError> {
    let files = collect_files(data_dir);

    write_atomic(manifest_path, files.join("\n").as_bytes())?;

    let size = files
        .iter()
        .filter_map(|path| std::fs::metadata(path).ok())
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
        .sum();

    debug!(
        "Wrote manifest {} with {} files ({} bytes)",
        manifest_path.display(),
        files.len(),
        size
    );

    Ok(Toc {
        manifest_path: manifest_path.to_path_buf(),
        file_count: files.len(),
        files,
        size,
    })
}

/// Creates an empty manifest if none exists yet.
pub fn touch_manifest(manifest_path: &Path) -> Result<(), StorageError> {
    if manifest_path.is_file() {
        return Ok(());
    }
    write_atomic(manifest_path, b"")
}

/// Reads the file list of a manifest. A missing manifest reads as empty.
pub fn read_manifest(manifest_path: &Path) -> Result<Vec<String>, StorageError> {
    let content = match std::fs::read_to_string(manifest_path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Manifest {} is missing", manifest_path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(StorageError::ReadFile {
                path: manifest_path.to_path_buf(),
                source: e,
            })
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
