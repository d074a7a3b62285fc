//! Telemetry poller configuration.

use serde::{Deserialize, Serialize};

/// Poller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Feed API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Channel to read. The poller is disabled when unset.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Read API key (public channels need none).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Seconds between poll cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Entries fetched per cycle.
    #[serde(default = "default_results")]
    pub results: u32,
}

fn default_base_url() -> String {
    "https://api.thingspeak.com".to_string()
}

fn default_interval_secs() -> u64 {
    60
}

fn default_results() -> u32 {
    5
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            channel_id: None,
            api_key: None,
            interval_secs: default_interval_secs(),
            results: default_results(),
        }
    }
}

impl PollerConfig {
    /// Whether enough is configured to run the poller.
    pub fn is_enabled(&self) -> bool {
        self.channel_id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.results, 5);
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_enabled_requires_channel() {
        let mut config = PollerConfig {
            channel_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!config.is_enabled());
        config.channel_id = Some("123456".to_string());
        assert!(config.is_enabled());
    }
}
