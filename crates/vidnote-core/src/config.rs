//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the
//! backend and app URLs, refresh cadence, request timeout, where tokens are
//! stored locally, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/vidnote/config.json`. The URLs can
//! be overridden with `VIDNOTE_BACKEND_URL` and `VIDNOTE_APP_URL`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "vidnote";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Proactive refresh cadence. Access credentials live for an hour, so four
/// minutes keeps a wide margin without hammering the refresh endpoint.
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 240;

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const BACKEND_URL_ENV: &str = "VIDNOTE_BACKEND_URL";
pub const APP_URL_ENV: &str = "VIDNOTE_APP_URL";

/// Backing store for the locally held credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    /// `session.json` in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only; nothing survives exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub app_url: String,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub token_storage: TokenStorage,
    pub last_email: Option<String>,
    /// URLs as read from the file, kept while an environment override is
    /// in effect so `save` never persists the override
    #[serde(skip)]
    file_urls: Option<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            token_storage: TokenStorage::default(),
            last_email: None,
            file_urls: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?, |key| std::env::var(key).ok())
    }

    pub fn load_from(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(lookup);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Write the config, with overridden URLs restored to their file values
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut persisted = self.clone();
        if let Some((backend_url, app_url)) = self.file_urls.clone() {
            persisted.backend_url = backend_url;
            persisted.app_url = app_url;
        }
        let contents = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Apply URL overrides from a key lookup (the environment in production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let backend = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty());
        let app = lookup(APP_URL_ENV).filter(|v| !v.trim().is_empty());
        if backend.is_none() && app.is_none() {
            return;
        }
        if self.file_urls.is_none() {
            self.file_urls = Some((self.backend_url.clone(), self.app_url.clone()));
        }
        if let Some(url) = backend {
            self.backend_url = url;
        }
        if let Some(url) = app {
            self.app_url = url;
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"backend_url":"https://api.vidnote.app","token_storage":"keyring"}"#)
                .expect("parse config");
        assert_eq!(config.backend_url, "https://api.vidnote.app");
        assert_eq!(config.app_url, DEFAULT_APP_URL);
        assert_eq!(config.token_storage, TokenStorage::Keyring);
        assert_eq!(config.refresh_interval(), Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS));
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            BACKEND_URL_ENV => Some("https://staging-api.vidnote.app".to_string()),
            APP_URL_ENV => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.backend_url, "https://staging-api.vidnote.app");
        assert_eq!(config.app_url, DEFAULT_APP_URL);
    }

    #[test]
    fn test_env_override_is_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vidnote").join(CONFIG_FILE);
        let staging = |key: &str| {
            (key == BACKEND_URL_ENV).then(|| "https://staging.example".to_string())
        };

        let mut config = Config::load_from(&path, staging).expect("load with override");
        assert_eq!(config.backend_url, "https://staging.example");
        config.last_email = Some("ada@example.com".to_string());
        config.save_to(&path).expect("save");

        let reloaded = Config::load_from(&path, |_| None).expect("reload");
        assert_eq!(reloaded.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(reloaded.app_url, DEFAULT_APP_URL);
        assert_eq!(reloaded.last_email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_saved_urls_survive_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let stored = Config {
            backend_url: "https://api.vidnote.app".to_string(),
            ..Default::default()
        };
        stored.save_to(&path).expect("save");

        let overridden = Config::load_from(&path, |key| {
            (key == APP_URL_ENV).then(|| "http://localhost:4000".to_string())
        })
        .expect("load");
        assert_eq!(overridden.app_url, "http://localhost:4000");
        overridden.save_to(&path).expect("save again");

        let reloaded = Config::load_from(&path, |_| None).expect("reload");
        assert_eq!(reloaded.backend_url, "https://api.vidnote.app");
        assert_eq!(reloaded.app_url, DEFAULT_APP_URL);
    }

    #[test]
    fn test_zero_refresh_interval_is_clamped() {
        let config = Config {
            refresh_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }
}
