use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::aggregate::ProjectCounts;
use crate::model::{Analysis, Editor, UserId};
use crate::sync::Propagation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Data,
    Analysis,
    Job,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Data => "data",
            EntityKind::Analysis => "recipe",
            EntityKind::Job => "job",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State carried through the post-write stages of one save.
///
/// The hub fills in what each stage has to do; the stages record what they
/// did in the result fields.
#[derive(Debug, Clone)]
pub struct SaveContext {
    // Input
    pub kind: EntityKind,
    pub uid: String,
    pub project_id: i64,
    pub created: bool,
    pub editor: Editor,
    pub date: DateTime<Utc>,

    // EnsureDirs
    pub directories: Vec<PathBuf>,

    // TouchManifest
    pub manifest: Option<PathBuf>,

    // RefreshCounts
    pub refresh_counts: bool,
    pub counts: Option<ProjectCounts>,

    // PropagateClones
    pub clone_root: Option<Analysis>,
    pub propagation: Option<Propagation>,

    // TouchProject
    pub touch_project: bool,

    // GrantOwnerAccess
    pub owner: Option<UserId>,
    pub owner_granted: bool,
}

impl SaveContext {
    pub fn new(
        kind: EntityKind,
        uid: &str,
        project_id: i64,
        created: bool,
        editor: Editor,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            uid: uid.to_string(),
            project_id,
            created,
            editor,
            date,
            directories: Vec::new(),
            manifest: None,
            refresh_counts: false,
            counts: None,
            clone_root: None,
            propagation: None,
            touch_project: false,
            owner: None,
            owner_granted: false,
        }
    }

    pub fn with_directory(mut self, path: PathBuf) -> Self {
        self.directories.push(path);
        self
    }

    pub fn with_manifest(mut self, path: PathBuf) -> Self {
        self.manifest = Some(path);
        self
    }

    pub fn with_count_refresh(mut self) -> Self {
        self.refresh_counts = true;
        self
    }

    /// Pushes the fields of `root` to its clones.
    pub fn with_clone_root(mut self, root: Analysis) -> Self {
        self.clone_root = Some(root);
        self
    }

    pub fn with_project_touch(mut self) -> Self {
        self.touch_project = true;
        self
    }

    /// Makes sure `owner` holds write access to the project.
    pub fn with_owner_grant(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }
}
