//! Application configuration.
//!
//! Loaded from a TOML file, then selected values are overridden from the
//! environment (a `.env` file is read first by the binary).

use std::path::Path;

use envwatch_core::Thresholds;
use envwatch_dashboard::DashboardConfig;
use envwatch_feed::PollerConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Reading store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `file://<dir>` for JSON Lines files, `memory://` for a volatile store.
    #[serde(default = "default_store_uri")]
    pub uri: String,
}

fn default_store_uri() -> String {
    "file://./data/readings".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_store_uri(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: DashboardConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    /// Thresholds in effect at start-up.
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl AppConfig {
    /// Load from `path` if it exists (defaults otherwise), then apply
    /// environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            warn!(path = %path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.thresholds = config.thresholds.normalized();
        Ok(config)
    }

    /// Override values from `lookup` (the process environment in production).
    ///
    /// Recognized keys: `PORT`, `STORE_URI` (or `MONGO_URI`),
    /// `THINGSPEAK_CHANNEL_ID`, `THINGSPEAK_API_KEY`, `THINGSPEAK_BASE_URL`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid PORT '{port}': {e}")))?;
        }
        if let Some(uri) = lookup("STORE_URI").or_else(|| lookup("MONGO_URI")) {
            self.store.uri = uri;
        }
        if let Some(channel_id) = lookup("THINGSPEAK_CHANNEL_ID") {
            self.poller.channel_id = Some(channel_id);
        }
        if let Some(api_key) = lookup("THINGSPEAK_API_KEY") {
            self.poller.api_key = Some(api_key);
        }
        if let Some(base_url) = lookup("THINGSPEAK_BASE_URL") {
            self.poller.base_url = base_url;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.store.uri, "file://./data/readings");
        assert!(!config.poller.is_enabled());
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080

[thresholds]
temperature_max = 28.0
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.thresholds.temperature_max, 28.0);
        assert_eq!(config.thresholds.humidity_min, 40.0);
        assert_eq!(config.poller.interval_secs, 60);
    }

    #[test]
    fn test_file_light_min_is_truncated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds]\nlight_min = 150.7").unwrap();

        let config = AppConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.thresholds.light_min, 150.0);
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let err = AppConfig::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/envwatch.toml").unwrap();
        assert_eq!(config.server.max_connections, 100);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("PORT", "4000"),
                ("MONGO_URI", "memory://"),
                ("THINGSPEAK_CHANNEL_ID", "12345"),
                ("THINGSPEAK_API_KEY", ""),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.store.uri, "memory://");
        assert_eq!(config.poller.channel_id.as_deref(), Some("12345"));
        assert!(config.poller.api_key.is_none(), "empty values are ignored");
        assert!(config.poller.is_enabled());
    }

    #[test]
    fn test_store_uri_takes_precedence() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("STORE_URI", "file:///srv/envwatch"), ("MONGO_URI", "memory://")]))
            .unwrap();
        assert_eq!(config.store.uri, "file:///srv/envwatch");
    }

    #[test]
    fn test_invalid_port() {
        let mut config = AppConfig::default();
        let err = config.apply_overrides(env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("PORT")));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("temperature_max"));
    }
}
