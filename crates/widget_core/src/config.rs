use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::SettingsError;

pub const DEFAULT_SETTINGS_FILE: &str = "widget.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub api_base_url: String,
    /// Persist the session id here instead of keeping it in memory.
    pub session_file: Option<PathBuf>,
    pub assistant_name: String,
    pub welcome_message: Option<String>,
    pub image_subject: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".into(),
            session_file: None,
            assistant_name: "FishAI Assistant".into(),
            welcome_message: Some(
                "Hello! I'm your Bangladesh small fish expert assistant. \
                 What would you like to know about Bangladesh's small fishes?"
                    .into(),
            ),
            image_subject: "fish".into(),
        }
    }
}

/// Loads settings from an optional TOML file, then applies environment overrides.
/// A missing file is not an error; an unreadable or malformed one is.
pub fn load_settings(path: Option<&Path>) -> Result<WidgetSettings, SettingsError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<WidgetSettings, SettingsError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(WidgetSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn apply_env_overrides(settings: &mut WidgetSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("WIDGET_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__SESSION_FILE") {
        settings.session_file = non_empty(v).map(PathBuf::from);
    }

    if let Some(v) = lookup("APP__ASSISTANT_NAME") {
        settings.assistant_name = v;
    }

    if let Some(v) = lookup("APP__WELCOME_MESSAGE") {
        settings.welcome_message = non_empty(v);
    }

    if let Some(v) = lookup("APP__IMAGE_SUBJECT") {
        if let Some(subject) = non_empty(v) {
            settings.image_subject = subject;
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
