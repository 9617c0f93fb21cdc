use crate::error::{Result, YabpError};
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub const CURSOR_KEY: &str = "cursorKey";
pub const DEFAULT_PROJECT_PATH_KEY: &str = "defaultProjectPath";
pub const AGENT_COMMAND_KEY: &str = "agentCommand";

/// Global settings, stored as `config/global.json` under the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Credential handed to the live backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_key: Option<String>,
    /// Base directory for projects not listed in the registry.
    #[serde(default = "default_project_path")]
    pub default_project_path: PathBuf,
    /// Explicit executable for the live backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_command: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_project_path() -> PathBuf {
    PathBuf::from("/projects")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cursor_key: None,
            default_project_path: default_project_path(),
            agent_command: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Missing file means defaults.
    pub fn load(home: &Path) -> Result<Self> {
        io::read_json_or_default(&paths::global_config_path(home))
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        io::write_json(&paths::global_config_path(home), self)
    }

    /// Set one known key from its string form. An empty value clears the
    /// optional keys and resets `defaultProjectPath`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let opt = || (!value.is_empty()).then(|| value.to_string());
        match key {
            CURSOR_KEY => self.cursor_key = opt(),
            AGENT_COMMAND_KEY => self.agent_command = opt(),
            DEFAULT_PROJECT_PATH_KEY => {
                self.default_project_path = if value.is_empty() {
                    default_project_path()
                } else {
                    PathBuf::from(value)
                };
            }
            other => return Err(YabpError::InvalidSetting(other.to_string())),
        }
        Ok(())
    }

    /// The credential, if configured and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.cursor_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Same shape as [`Settings`] but with the credential masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(key) = copy.cursor_key.as_mut() {
            let skip = key.chars().count().saturating_sub(4);
            let tail: String = key.chars().skip(skip).collect();
            *key = format!("****{tail}");
        }
        copy
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.credential().is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("{CURSOR_KEY} is not set; live runs will have no credential"),
            });
        }

        if !self.default_project_path.is_absolute() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "{DEFAULT_PROJECT_PATH_KEY} '{}' is relative; it resolves against the working directory",
                    self.default_project_path.display()
                ),
            });
        }

        if let Some(cmd) = &self.agent_command {
            let path = Path::new(cmd);
            if path.components().count() > 1 && !path.exists() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{AGENT_COMMAND_KEY} '{cmd}' does not exist"),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
