use chrono::{DateTime, Utc};

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeSecurity {
    /// Trusted users may run the recipe.
    Authorized,
    /// Only administrators may run the recipe.
    NotAuthorized,
}

impl RecipeSecurity {
    pub fn code(self) -> i64 {
        match self {
            RecipeSecurity::Authorized => 1,
            RecipeSecurity::NotAuthorized => 2,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => RecipeSecurity::Authorized,
            2 => RecipeSecurity::NotAuthorized,
            other => {
                log::warn!("Unknown recipe security {}, treating as not authorized", other);
                RecipeSecurity::NotAuthorized
            }
        }
    }
}

/// A recipe: a named, parameterized script template owned by a project.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub id: i64,
    pub uid: String,
    pub project_id: i64,
    pub name: String,
    pub text: String,
    pub html: String,
    /// Parameter payload (TOML).
    pub json_text: String,
    pub template: String,
    pub security: RecipeSecurity,
    /// Recipe this one was cloned from.
    pub root_id: Option<i64>,
    pub owner: UserId,
    pub rank: f64,
    pub deleted: bool,
    pub image: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub lastedit_user: Option<UserId>,
    pub lastedit_date: Option<DateTime<Utc>>,
}

impl Analysis {
    pub fn new(project_id: i64, owner: UserId, name: &str) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            project_id,
            name: name.to_string(),
            text: "This is the recipe description.".to_string(),
            html: String::new(),
            json_text: String::new(),
            template: String::new(),
            security: RecipeSecurity::NotAuthorized,
            root_id: None,
            owner,
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

    pub fn is_cloned(&self) -> bool {
        self.root_id.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.root_id.is_none()
    }

    pub fn runnable(&self) -> bool {
        self.security == RecipeSecurity::Authorized
    }

    pub fn summary(&self) -> &str {
        super::first_line(&self.text)
    }

    pub fn display_name(&self) -> String {
        super::display_name(&self.name, self.deleted)
    }

    pub fn url_path(&self) -> String {
        assert!(
            !self.uid.trim().is_empty(),
            "Sanity check. UID should always be set."
        );
        format!("recipe/view/{}/", self.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_codes_round_trip() {
        for security in [RecipeSecurity::Authorized, RecipeSecurity::NotAuthorized] {
            assert_eq!(RecipeSecurity::from_code(security.code()), security);
        }
    }

    #[test]
    fn test_new_recipe_is_not_runnable() {
        let recipe = Analysis::new(1, 1, "FastQC");
        assert!(!recipe.runnable());
        assert!(recipe.is_root());
        assert!(!recipe.is_cloned());
    }

    #[test]
    fn test_clone_flags() {
        let mut recipe = Analysis::new(1, 1, "FastQC");
        recipe.root_id = Some(9);
        assert!(recipe.is_cloned());
        assert!(!recipe.is_root());
    }

    #[test]
    fn test_authorized_is_runnable() {
        let mut recipe = Analysis::new(1, 1, "FastQC");
        recipe.security = RecipeSecurity::Authorized;
        assert!(recipe.runnable());
    }
}
