//! Configuration Management
//!
//! Handles persistent configuration storage for cloudscale-provider.

use crate::api::client::{CloudscaleClient, DEFAULT_API_URL, DEFAULT_TIMEOUT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const TOKEN_ENV: &str = "CLOUDSCALE_API_TOKEN";
pub const URL_ENV: &str = "CLOUDSCALE_API_URL";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// API token (read/write scope)
    #[serde(default)]
    pub api_token: Option<String>,
    /// API endpoint, defaults to the public API
    #[serde(default)]
    pub api_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudscale-provider").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Overlay environment variables on top of the file values
    pub fn with_env(mut self) -> Self {
        if let Some(token) = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()) {
            self.api_token = Some(token);
        }
        if let Some(url) = std::env::var(URL_ENV).ok().filter(|u| !u.is_empty()) {
            self.api_url = Some(url);
        }
        self
    }

    /// Overlay explicit values (command line flags) on top of everything else
    pub fn with_overrides(mut self, token: Option<&str>, url: Option<&str>, timeout_secs: Option<u64>) -> Self {
        if let Some(token) = token {
            self.api_token = Some(token.to_string());
        }
        if let Some(url) = url {
            self.api_url = Some(url.to_string());
        }
        if timeout_secs.is_some() {
            self.timeout_secs = timeout_secs;
        }
        self
    }

    /// Get effective API URL (CLI > env > config > default)
    pub fn effective_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn effective_timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Build the typed client described by this configuration
    pub fn client(&self) -> Result<CloudscaleClient> {
        let token = self.api_token.as_deref().unwrap_or_default();
        CloudscaleClient::new(&self.effective_url(), token, self.effective_timeout())
            .context("Failed to configure the cloudscale.ch client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_url(), DEFAULT_API_URL);
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);
        assert!(config.client().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_token: Some("secret".to_string()),
            api_url: Some("http://localhost:8080/v1".to_string()),
            timeout_secs: Some(5),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        assert!(loaded.client().is_ok());
    }

    #[test]
    fn test_overrides_keep_unset_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Config {
            api_token: Some("old".to_string()),
            api_url: Some("http://localhost:8080/v1".to_string()),
            timeout_secs: None,
        }
        .save_to(&path)
        .unwrap();

        let updated = Config::load_from(&path).with_overrides(Some("new"), None, Some(10));
        updated.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.api_token.as_deref(), Some("new"));
        assert_eq!(loaded.effective_url(), "http://localhost:8080/v1");
        assert_eq!(loaded.effective_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }
}
