use super::UserId;

/// A named group of command snippets.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetType {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub owner: UserId,
    /// Visible to every user.
    pub is_default: bool,
    pub image: Option<String>,
}

impl SnippetType {
    pub fn new(owner: UserId, name: &str) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            name: name.to_string(),
            owner,
            is_default: false,
            image: None,
        }
    }
}

/// A reusable command fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub id: i64,
    pub uid: String,
    pub help_text: String,
    pub command: Option<String>,
    pub type_id: i64,
    /// Defaults to the owner of the snippet type on save.
    pub owner: Option<UserId>,
    pub is_default: bool,
}

impl Snippet {
    pub fn new(snippet_type: &SnippetType, command: &str, help_text: &str) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            help_text: help_text.to_string(),
            command: Some(command.to_string()),
            type_id: snippet_type.id,
            owner: None,
            is_default: false,
        }
    }
}
