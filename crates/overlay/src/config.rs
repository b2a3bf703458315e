//! Configuration management for the overlay host.
//!
//! Loads and validates `overlay.toml`. Plugin settings such as API keys live
//! in a separate JSON file, see [`crate::settings`].

use anyhow::Context;
use lookup_core::{ClientConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub overlay: OverlaySettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default = "ServiceSettings::antisniper")]
    pub antisniper: ServiceSettings,
    #[serde(default = "ServiceSettings::seraph")]
    pub seraph: ServiceSettings,
    #[serde(default)]
    pub keybinds: KeybindSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// JSON file holding the plugin settings
    pub settings_path: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            settings_path: "settings.json".to_string(),
        }
    }
}

/// Outbound HTTP behaviour shared by the lookup plugins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per request, including the first one
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Linear backoff between attempts in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// One remote lookup service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub enabled: bool,
    pub base_url: String,
}

impl ServiceSettings {
    fn antisniper() -> Self {
        Self {
            enabled: true,
            base_url: plugin_antisniper::DEFAULT_API.to_string(),
        }
    }

    fn seraph() -> Self {
        Self {
            enabled: true,
            base_url: plugin_seraph::DEFAULT_API.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeybindSettings {
    pub enabled: bool,
}

impl Default for KeybindSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            overlay: OverlaySettings::default(),
            http: HttpSettings::default(),
            antisniper: ServiceSettings::antisniper(),
            seraph: ServiceSettings::seraph(),
            keybinds: KeybindSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to it and
    /// returns that.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        PathBuf::from(&self.overlay.settings_path)
    }

    /// HTTP client settings for the lookup plugins.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            retry: RetryPolicy {
                attempts: self.http.retry_attempts,
                backoff: Duration::from_millis(self.http.retry_backoff_ms),
            },
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        if self.overlay.settings_path.is_empty() {
            return Err("Settings path cannot be empty".to_string());
        }

        if self.http.timeout_secs == 0 {
            return Err("HTTP timeout must be at least one second".to_string());
        }
        if self.http.retry_attempts == 0 {
            return Err("HTTP retry attempts must be at least 1".to_string());
        }

        for (name, service) in [("antisniper", &self.antisniper), ("seraph", &self.seraph)] {
            if service.enabled
                && !(service.base_url.starts_with("http://") || service.base_url.starts_with("https://"))
            {
                return Err(format!(
                    "Invalid {} base URL: {}",
                    name, service.base_url
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.overlay.settings_path, "settings.json");
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.retry_attempts, 2);
        assert_eq!(config.http.retry_backoff_ms, 250);
        assert_eq!(config.antisniper.base_url, "https://api.antisniper.net");
        assert_eq!(config.seraph.base_url, "https://api.seraph.si");
        assert!(config.keybinds.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overlay.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();

        assert_eq!(config.http.timeout_secs, 10);
        assert!(path.exists());

        let written: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.seraph.base_url, config.seraph.base_url);
    }

    #[tokio::test]
    async fn test_load_partial_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"
[http]
timeout_secs = 3

[seraph]
enabled = false
base_url = "http://localhost:9000"

[logging]
level = "debug"
json_format = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();

        assert_eq!(config.http.timeout_secs, 3);
        assert_eq!(config.http.retry_attempts, 2);
        assert!(!config.seraph.enabled);
        assert!(config.antisniper.enabled);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.overlay.settings_path, "settings.json");
    }

    #[tokio::test]
    async fn test_load_malformed_file_fails() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[http\ntimeout_secs = ").unwrap();

        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }

    #[test]
    fn test_client_config_conversion() {
        let mut config = AppConfig::default();
        config.http.timeout_secs = 4;
        config.http.retry_attempts = 3;
        config.http.retry_backoff_ms = 100;

        let client = config.client_config();
        assert_eq!(client.timeout, Duration::from_secs(4));
        assert_eq!(client.retry.attempts, 3);
        assert_eq!(client.retry.backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_http_limits() {
        let mut config = AppConfig::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.http.retry_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_base_url() {
        let mut config = AppConfig::default();
        config.antisniper.base_url = "api.antisniper.net".to_string();
        assert!(config.validate().is_err());

        // a disabled service is not checked
        config.antisniper.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_settings_path() {
        let mut config = AppConfig::default();
        config.overlay.settings_path.clear();
        assert!(config.validate().is_err());
    }
}
