use chrono::{DateTime, Utc};

use crate::params::{ParamMap, ParamValue};

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privacy {
    Public,
    Shared,
    Private,
}

impl Privacy {
    pub fn code(self) -> i64 {
        match self {
            Privacy::Public => 1,
            Privacy::Shared => 2,
            Privacy::Private => 3,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Privacy::Public,
            2 => Privacy::Shared,
            3 => Privacy::Private,
            other => {
                log::warn!("Unknown privacy code {}, treating as private", other);
                Privacy::Private
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Privacy::Public => "Public",
            Privacy::Shared => "Shared",
            Privacy::Private => "Private",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    /// Internal identifier, assigned once and never edited.
    pub uid: String,
    /// Editable unique label, defaults to the uid.
    pub label: Option<String>,
    pub name: String,
    pub privacy: Privacy,
    pub owner: UserId,
    pub text: String,
    pub html: String,
    pub rank: f64,
    pub deleted: bool,
    pub sharable_token: Option<String>,
    pub image: Option<String>,
    pub data_count: i64,
    pub recipes_count: i64,
    pub jobs_count: i64,
    pub date: Option<DateTime<Utc>>,
    pub lastedit_user: Option<UserId>,
    pub lastedit_date: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(owner: UserId, name: &str) -> Self {
        Self {
            id: 0,
            uid: String::new(),
            label: None,
            name: name.to_string(),
            privacy: Privacy::Private,
            owner,
            text: "Project description.".to_string(),
            html: String::new(),
            rank: 100.0,
            deleted: false,
            sharable_token: None,
            image: None,
            data_count: 0,
            recipes_count: 0,
            jobs_count: 0,
            date: None,
            lastedit_user: None,
            lastedit_date: None,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id > 0
    }

    pub fn is_public(&self) -> bool {
        self.privacy == Privacy::Public
    }

    pub fn is_private(&self) -> bool {
        self.privacy == Privacy::Private
    }

    pub fn is_shareable(&self) -> bool {
        self.privacy == Privacy::Shared
    }

    pub fn summary(&self) -> &str {
        super::first_line(&self.text)
    }

    pub fn display_name(&self) -> String {
        super::display_name(&self.name, self.deleted)
    }

    /// Site-relative path of the project page.
    pub fn url_path(&self) -> String {
        assert!(
            !self.uid.trim().is_empty(),
            "Sanity check. UID should always be set."
        );
        format!("project/{}/", self.uid)
    }

    /// Share link, only for shareable projects.
    pub fn sharable_path(&self) -> Option<String> {
        match (&self.sharable_token, self.is_shareable()) {
            (Some(token), true) => Some(format!("project/share/{}/", token)),
            _ => None,
        }
    }

    /// Project-level parameter payload handed to exports: a `settings` table
    /// describing the project plus the uids of its recipes.
    pub fn settings_payload(&self, base_url: &str, recipe_uids: Vec<String>) -> ParamMap {
        let slug = self.name.split_whitespace().collect::<Vec<_>>().join("_");
        let image = format!("{}-{}.png", slug, self.id);

        let mut settings = ParamMap::new();
        settings.insert("uid".into(), self.uid.as_str().into());
        settings.insert("name".into(), self.name.as_str().into());
        settings.insert("image".into(), image.into());
        settings.insert("privacy".into(), self.privacy.label().into());
        settings.insert("help".into(), self.text.as_str().into());
        settings.insert("url".into(), base_url.into());
        settings.insert("project_uid".into(), self.uid.as_str().into());
        settings.insert("id".into(), self.id.into());

        let mut payload = ParamMap::new();
        payload.insert("settings".into(), ParamValue::Table(settings));
        payload.insert("recipes".into(), recipe_uids.into());
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_privacy_codes_round_trip() {
        for privacy in [Privacy::Public, Privacy::Shared, Privacy::Private] {
            assert_eq!(Privacy::from_code(privacy.code()), privacy);
        }
    }

    #[test]
    fn test_unknown_privacy_is_private() {
        assert_eq!(Privacy::from_code(42), Privacy::Private);
    }

    #[test]
    fn test_new_project_defaults() {
        let project = Project::new(7, "Genome");
        assert!(!project.is_saved());
        assert!(project.is_private());
        assert_eq!(project.rank, 100.0);
        assert_eq!(project.summary(), "Project description.");
    }

    #[test]
    fn test_sharable_path_requires_shared_privacy() {
        let mut project = Project::new(1, "P");
        project.sharable_token = Some("tok".to_string());
        assert!(project.sharable_path().is_none());

        project.privacy = Privacy::Shared;
        assert_eq!(project.sharable_path().as_deref(), Some("project/share/tok/"));
    }

    #[test]
    #[should_panic(expected = "UID should always be set")]
    fn test_url_path_requires_uid() {
        Project::new(1, "P").url_path();
    }

    #[test]
    fn test_settings_payload() {
        let mut project = Project::new(1, "My Genome Project");
        project.id = 5;
        project.uid = "abcd1234".to_string();

        let payload = project.settings_payload("http://x", vec!["r1".into(), "r2".into()]);
        let settings = params::get_table(&payload, "settings").unwrap();
        assert_eq!(params::get_str(settings, "image"), Some("My_Genome_Project-5.png"));
        assert_eq!(params::get_str(settings, "privacy"), Some("Private"));
        assert_eq!(params::get_str(settings, "project_uid"), Some("abcd1234"));
        assert_eq!(payload.get("recipes").and_then(|r| r.as_list()).map(|r| r.len()), Some(2));
    }
}
