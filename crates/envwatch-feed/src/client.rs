//! HTTP client for the ThingSpeak channel feed API.

use std::time::Duration;

use envwatch_core::reading::{coerce_number, parse_timestamp};
use envwatch_core::Reading;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PollerConfig;
use crate::error::{FeedError, FeedResult};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One channel entry. ThingSpeak sends field values as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    pub created_at: Option<String>,
    #[serde(default)]
    pub entry_id: Option<u64>,
    #[serde(default)]
    pub field1: Option<Value>,
    #[serde(default)]
    pub field2: Option<Value>,
    #[serde(default)]
    pub field3: Option<Value>,
}

impl FeedEntry {
    /// Map into a reading: field1 is temperature, field2 humidity, field3 light.
    pub fn to_reading(&self) -> FeedResult<Reading> {
        let created_at = self
            .created_at
            .as_deref()
            .ok_or_else(|| FeedError::Parse(format!("entry {:?} has no created_at", self.entry_id)))
            .and_then(|s| parse_timestamp(s).map_err(|e| FeedError::Parse(e.to_string())))?;

        let metric = |name: &str, value: &Option<Value>| -> FeedResult<f64> {
            value.as_ref().and_then(coerce_number).ok_or_else(|| {
                FeedError::Parse(format!("entry {:?}: {name} is not numeric", self.entry_id))
            })
        };

        Ok(Reading::new(
            created_at,
            metric("field1", &self.field1)?,
            metric("field2", &self.field2)?,
            metric("field3", &self.field3)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct FeedsResponse {
    #[serde(default)]
    feeds: Vec<FeedEntry>,
}

/// Client for a single ThingSpeak channel.
pub struct ThingSpeakClient {
    /// HTTP client.
    client: Client,
    base_url: String,
    channel_id: String,
    api_key: Option<String>,
}

impl ThingSpeakClient {
    /// Create a client for `channel_id` under `base_url`
    /// (e.g. "https://api.thingspeak.com").
    pub fn new(
        base_url: impl Into<String>,
        channel_id: impl Into<String>,
        api_key: Option<String>,
    ) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            channel_id: channel_id.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Build a client from poller configuration.
    pub fn from_config(config: &PollerConfig) -> FeedResult<Self> {
        let channel_id = config
            .channel_id
            .clone()
            .filter(|_| config.is_enabled())
            .ok_or_else(|| FeedError::NotConfigured("no channel id".to_string()))?;
        Self::new(config.base_url.clone(), channel_id, config.api_key.clone())
    }

    /// Channel feed URL.
    pub fn feeds_url(&self) -> String {
        format!("{}/channels/{}/feeds.json", self.base_url, self.channel_id)
    }

    /// Fetch the last `results` entries of the channel.
    pub async fn fetch_feeds(&self, results: u32) -> FeedResult<Vec<FeedEntry>> {
        let url = self.feeds_url();
        debug!(url = %url, results, "Fetching channel feed");

        let mut query: Vec<(&str, String)> = vec![("results", results.to_string())];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| FeedError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body: FeedsResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Parse(format!("Failed to parse feed response: {e}")))?;

        info!(
            channel = %self.channel_id,
            entries = body.feeds.len(),
            "Fetched channel feed"
        );

        Ok(body.feeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_to_reading() {
        let entry: FeedEntry = serde_json::from_value(json!({
            "created_at": "2024-03-01T10:00:00Z",
            "entry_id": 42,
            "field1": "23.5",
            "field2": "61",
            "field3": "310"
        }))
        .unwrap();

        let reading = entry.to_reading().unwrap();
        assert_eq!(reading.temperature, 23.5);
        assert_eq!(reading.humidity, 61.0);
        assert_eq!(reading.light, 310.0);
        assert_eq!(reading.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_entry_with_missing_field_is_rejected() {
        let entry: FeedEntry = serde_json::from_value(json!({
            "created_at": "2024-03-01T10:00:00Z",
            "entry_id": 43,
            "field1": "23.5",
            "field2": null,
            "field3": "310"
        }))
        .unwrap();

        let err = entry.to_reading().unwrap_err();
        assert!(matches!(err, FeedError::Parse(ref m) if m.contains("field2")));
    }

    #[test]
    fn test_feeds_url_trims_trailing_slash() {
        let client = ThingSpeakClient::new("http://localhost:9000/", "1234", None).unwrap();
        assert_eq!(client.feeds_url(), "http://localhost:9000/channels/1234/feeds.json");
    }

    #[test]
    fn test_from_config_requires_channel() {
        let config = PollerConfig::default();
        assert!(matches!(
            ThingSpeakClient::from_config(&config),
            Err(FeedError::NotConfigured(_))
        ));
    }
}
