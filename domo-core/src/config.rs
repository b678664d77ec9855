//! Client configuration
//!
//! Config files are stored in platform-appropriate locations:
//! - Linux: ~/.config/domo/
//! - macOS: ~/Library/Application Support/domo/
//! - Windows: %APPDATA%\domo\

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoDirFound,
}

/// Client-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Hub API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (the only timeout the client imposes)
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where the credential pair is persisted; defaults to
    /// `credentials.json` next to the config file
    pub credentials_path: Option<PathBuf>,

    /// Room preselected by clients that show one room at a time
    pub default_room: Option<String>,
}

// Default value functions
fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            credentials_path: None,
            default_room: None,
        }
    }
}

impl ClientConfig {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("domo"))
            .ok_or(ConfigError::NoDirFound)
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved credentials file location
    pub fn credentials_file(&self) -> PathBuf {
        self.credentials_path.clone().unwrap_or_else(|| {
            Self::config_dir()
                .map(|d| d.join("credentials.json"))
                .unwrap_or_else(|_| PathBuf::from("credentials.json"))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
