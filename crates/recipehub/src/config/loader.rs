use std::path::{Path, PathBuf};

use crate::config::schema::Settings;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/settings-v1.json");

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let mut settings: Settings = serde_json::from_value(json_value)?;

    validate_settings(&settings)?;
    normalize_paths(&mut settings)?;

    Ok(settings)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported settings version: {}", settings.version),
        });
    }

    if settings.media_root == settings.toc_root {
        return Err(ConfigError::Validation {
            message: "media_root and toc_root must differ".to_string(),
        });
    }

    Ok(())
}

/// Makes relative roots absolute so manifests always list absolute paths.
fn normalize_paths(settings: &mut Settings) -> Result<(), ConfigError> {
    settings.media_root = absolute(&settings.media_root)?;
    settings.toc_root = absolute(&settings.toc_root)?;
    if let Some(db) = settings.database_path.take() {
        settings.database_path = Some(absolute(&db)?);
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|e| ConfigError::Validation {
        message: format!("Cannot resolve path '{}': {}", path.display(), e),
    })
}
