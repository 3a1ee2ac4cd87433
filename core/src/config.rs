//! Client configuration.
//!
//! Read from `$FORUM_CONFIG`, else `<config dir>/forum/config.toml`. Every
//! section is optional; a missing file means defaults. `$FORUM_API_URL`
//! replaces the configured base URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LogFormat;

pub const CONFIG_ENV: &str = "FORUM_CONFIG";
pub const API_URL_ENV: &str = "FORUM_API_URL";

const APP_DIR: &str = "forum";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file; defaults to `<data dir>/forum/session.json`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load from the resolved location and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = resolve_config_path()?;
        let mut config = Self::load_from_path(&path)?;
        config.apply_api_url(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load from `path`; a file that does not exist yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Read(e)),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        if config.api.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("api.base_url".to_string()));
        }
        Ok(config)
    }

    /// Replace the base URL when `url` is set and non-blank.
    pub fn apply_api_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn session_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.session.path {
            Some(path) => Ok(path.clone()),
            None => Ok(resolve_data_path()?.join("session.json")),
        }
    }
}

pub fn resolve_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let config_dir =
        dirs::config_dir().ok_or_else(|| ConfigError::Missing("config directory".to_string()))?;
    Ok(config_dir.join(APP_DIR).join("config.toml"))
}

pub fn resolve_data_path() -> Result<PathBuf, ConfigError> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| ConfigError::Missing("data directory".to_string()))?;
    Ok(data_dir.join(APP_DIR))
}
