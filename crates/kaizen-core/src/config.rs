use crate::error::{KaizenError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

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
// NotificationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON webhook that receives every notification. Without one,
    /// notifications are only logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_true() -> bool {
    true
}

fn default_subject_prefix() -> String {
    "[CI]".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            subject_prefix: default_subject_prefix(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    7870
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// The only category that runs the full DMAIC workflow.
    #[serde(default = "default_flagship")]
    pub flagship_category: String,
    /// How many times a mutation is replayed after losing a save race.
    #[serde(default = "default_retries")]
    pub max_save_retries: u32,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

fn default_flagship() -> String {
    "Black Belt".to_string()
}

fn default_retries() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            flagship_category: default_flagship(),
            max_save_retries: default_retries(),
            notifications: NotificationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(KaizenError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.flagship_category.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "flagship_category is empty; every opportunity would complete on creation"
                    .to_string(),
            });
        }

        if self.max_save_retries == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_save_retries is 0; concurrent edits will fail instead of retrying"
                    .to_string(),
            });
        } else if self.max_save_retries > 50 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "max_save_retries={} (>50 is unusual)",
                    self.max_save_retries
                ),
            });
        }

        if let Some(url) = &self.notifications.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("notifications.webhook_url '{url}' is not an http(s) URL"),
                });
            }
            if !self.notifications.enabled {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "notifications.webhook_url is set but notifications are disabled"
                        .to_string(),
                });
            }
        }

        if self.server.port == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.port is 0; an ephemeral port will be chosen".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
