use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::StorageError;

/// Creates `path` (and parents) if it does not exist yet.
pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.is_dir() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn require_uid(uid: &str) {
    assert!(
        !uid.trim().is_empty(),
        "Sanity check. UID should always be set."
    );
}

/// Deterministic on-disk locations of projects, data, jobs and manifests.
///
/// Every path is a pure function of entity uids, which never change once
/// assigned. The `ensure_*` variants additionally create the directory.
#[derive(Debug, Clone)]
pub struct Layout {
    media_root: PathBuf,
    toc_root: PathBuf,
}

impl Layout {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(media_root: P, toc_root: Q) -> Self {
        Self {
            media_root: media_root.as_ref().to_path_buf(),
            toc_root: toc_root.as_ref().to_path_buf(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.media_root, &settings.toc_root)
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    pub fn toc_root(&self) -> &Path {
        &self.toc_root
    }

    /// `<media_root>/projects/<uid>`
    pub fn project_dir(&self, project_uid: &str) -> PathBuf {
        require_uid(project_uid);
        self.media_root.join("projects").join(project_uid)
    }

    /// `<media_root>/projects/<project_uid>/<data_uid>`
    pub fn data_dir(&self, project_uid: &str, data_uid: &str) -> PathBuf {
        require_uid(data_uid);
        self.project_dir(project_uid).join(data_uid)
    }

    /// `<media_root>/jobs/<uid>`
    pub fn job_dir(&self, job_uid: &str) -> PathBuf {
        require_uid(job_uid);
        self.media_root.join("jobs").join(job_uid)
    }

    /// `<toc_root>/toc-<uid>.txt`
    pub fn toc_path(&self, data_uid: &str) -> PathBuf {
        require_uid(data_uid);
        self.toc_root.join(format!("toc-{}.txt", data_uid))
    }

    /// `<media_root>/projects/<uid>/images`
    pub fn images_dir(&self, project_uid: &str) -> PathBuf {
        self.project_dir(project_uid).join("images")
    }

    pub fn ensure_project_dir(&self, project_uid: &str) -> Result<PathBuf, StorageError> {
        let path = self.project_dir(project_uid);
        ensure_directory(&path)?;
        Ok(path)
    }

    pub fn ensure_data_dir(&self, project_uid: &str, data_uid: &str) -> Result<PathBuf, StorageError> {
        let path = self.data_dir(project_uid, data_uid);
        ensure_directory(&path)?;
        Ok(path)
    }

    pub fn ensure_job_dir(&self, job_uid: &str) -> Result<PathBuf, StorageError> {
        let path = self.job_dir(job_uid);
        ensure_directory(&path)?;
        Ok(path)
    }

    pub fn ensure_toc_root(&self) -> Result<&Path, StorageError> {
        ensure_directory(&self.toc_root)?;
        Ok(&self.toc_root)
    }
}
