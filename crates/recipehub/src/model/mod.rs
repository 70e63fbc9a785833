//! Domain entities: projects, their data, recipes and jobs.
//!
//! Entities are plain structs. Integer codes of the enum columns match the
//! values stored in the database. An `id` of `0` marks a row that has not
//! been inserted yet.

pub mod access;
pub mod data;
pub mod job;
pub mod project;
pub mod recipe;
pub mod snippet;

pub use access::{Access, AccessLevel};
pub use data::{Data, DataMethod, DataState};
pub use job::{format_elapsed, Job, JobSecurity, JobState};
pub use project::{Privacy, Project};
pub use recipe::{Analysis, RecipeSecurity};
pub use snippet::{Snippet, SnippetType};

/// Users live outside this crate; they are referenced by id only.
pub type UserId = i64;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_TEXT_LEN: usize = 10_000;
pub const MAX_LOG_LEN: usize = 20 * MAX_TEXT_LEN;

/// The user performing an edit, as seen by the save pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Editor {
    pub id: UserId,
    /// Trusted editors may embed raw HTML in descriptions.
    pub trusted: bool,
}

impl Editor {
    pub fn new(id: UserId) -> Self {
        Self { id, trusted: false }
    }

    pub fn trusted(id: UserId) -> Self {
        Self { id, trusted: true }
    }
}

/// Truncates to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(value: &mut String, max: usize) {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
}

/// First line of a description, used in listings.
pub(crate) fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

pub(crate) fn display_name(name: &str, deleted: bool) -> String {
    if deleted {
        format!("Deleted: {}", name)
    } else {
        name.to_string()
    }
}
