use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::storage::toc;

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    Pending,
    Ready,
    Error,
}

impl DataState {
    pub fn code(self) -> i64 {
        match self {
            DataState::Pending => 1,
            DataState::Ready => 2,
            DataState::Error => 3,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => DataState::Pending,
            2 => DataState::Ready,
            3 => DataState::Error,
            other => {
                log::warn!("Unknown data state {}, defaulting to Pending", other);
                DataState::Pending
            }
        }
    }
}

/// How the files of a data record got into its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMethod {
    Linked,
    Uploaded,
    TextEntry,
}

impl DataMethod {
    pub fn code(self) -> i64 {
        match self {
            DataMethod::Linked => 1,
            DataMethod::Uploaded => 2,
            DataMethod::TextEntry => 3,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => DataMethod::Linked,
            2 => DataMethod::Uploaded,
            3 => DataMethod::TextEntry,
            other => {
                log::warn!("Unknown data method {}, defaulting to Linked", other);
                DataMethod::Linked
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DataMethod::Linked => "Linked Data",
            DataMethod::Uploaded => "Uploaded Data",
            DataMethod::TextEntry => "Text Field",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub id: i64,
    pub uid: String,
    pub project_id: i64,
    pub name: String,
    pub state: DataState,
    pub method: DataMethod,
    /// Free-form type tag, stored without spaces.
    pub data_type: String,
    /// Path of the table-of-contents manifest.
    pub file: Option<PathBuf>,
    /// Cached by the TOC builder.
    pub size: i64,
    /// Cached by the TOC builder.
    pub file_count: i64,
    pub owner: Option<UserId>,
    pub text: String,
    pub html: String,
    pub rank: f64,
    pub deleted: bool,
    pub image: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub lastedit_user: Option<UserId>,
    pub lastedit_date: Option<DateTime<Utc>>,
}

impl Data {
    pub fn new(project_id: i64, name: &str) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            project_id,
            name: name.to_string(),
            state: DataState::Pending,
            method: DataMethod::Linked,
            data_type: "DATA".to_string(),
            file: None,
            size: 0,
            file_count: 0,
            owner: None,
            text: "Data description.".to_string(),
            html: String::new(),
            rank: 100.0,
            deleted: false,
            image: None,
            date: None,
            lastedit_user: None,
            lastedit_date: None,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id > 0
    }

    pub fn is_ready(&self) -> bool {
        self.state == DataState::Ready
    }

    pub fn summary(&self) -> &str {
        super::first_line(&self.text)
    }

    pub fn display_name(&self) -> String {
        super::display_name(&self.name, self.deleted)
    }

    /// Media-relative path of the data directory, with `path` appended.
    pub fn url_path(&self, project_uid: &str, path: &str) -> String {
        format!("projects/{}/{}/{}", project_uid, self.uid, path)
    }

    /// Paths listed in the manifest. A record without a manifest has none.
    pub fn files(&self) -> Result<Vec<String>, StorageError> {
        match &self.file {
            Some(manifest) => toc::read_manifest(manifest),
            None => Ok(Vec::new()),
        }
    }

    pub fn is_archive(&self) -> bool {
        self.file
            .as_ref()
            .map(|f| f.to_string_lossy().ends_with("tar.gz"))
            .unwrap_or(false)
    }
}
