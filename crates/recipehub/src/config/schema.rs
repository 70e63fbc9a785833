use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime settings shared by the filesystem layout and the materializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    /// Root under which `projects/` and `jobs/` are created.
    pub media_root: PathBuf,
    /// Directory holding the `toc-<uid>.txt` manifests.
    pub toc_root: PathBuf,
    /// Public URL of the site, exposed to recipes as `settings.url`.
    pub base_url: String,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(media_root: P, toc_root: Q, base_url: &str) -> Self {
        Self {
            version: "1.0".to_string(),
            media_root: media_root.as_ref().to_path_buf(),
            toc_root: toc_root.as_ref().to_path_buf(),
            base_url: base_url.to_string(),
            database_path: None,
            log_level: default_log_level(),
        }
    }

    /// Database location, defaulting to `<media_root>/recipehub.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.media_root.join("recipehub.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_path() {
        let settings = Settings::new("/srv/media", "/srv/toc", "http://localhost");
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/srv/media/recipehub.db")
        );
    }

    #[test]
    fn test_explicit_database_path() {
        let mut settings = Settings::new("/srv/media", "/srv/toc", "http://localhost");
        settings.database_path = Some(PathBuf::from("/var/db/hub.db"));
        assert_eq!(settings.database_path(), PathBuf::from("/var/db/hub.db"));
    }
}
