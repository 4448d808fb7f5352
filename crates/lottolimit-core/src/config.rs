//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the service address, retry tuning and the last username used.
//!
//! Configuration is stored at `~/.config/lottolimit/config.json`.
//! `LOTTOLIMIT_API_URL` in the environment overrides the stored address.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::RetryPolicy;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "lottolimit";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "LOTTOLIMIT_API_URL";

/// Service address used when nothing else is configured
pub const DEFAULT_API_URL: &str = "https://lottery-limit-backend.onrender.com";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_username: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the session file.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Base URL by precedence: explicit override, environment, config file, built-in default.
    pub fn resolve_api_url(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(API_URL_ENV).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            base_delay: self
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("lottolimit-missing-{}.json", std::process::id()));
        let config = Config::load_from(&path).unwrap();
        assert!(config.api_url.is_none());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("lottolimit-config-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);
        let config = Config {
            api_url: Some("http://localhost:3000".to_string()),
            last_username: Some("admin".to_string()),
            max_attempts: Some(0),
            base_delay_ms: Some(250),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_username.as_deref(), Some("admin"));
        let policy = loaded.retry_policy();
        // At least one attempt is always made
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_explicit_url_wins() {
        let config = Config {
            api_url: Some("http://from-config".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_api_url(Some("http://explicit")), "http://explicit");
    }
}
