//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use envwatch_core::{LiveReading, Reading, Stats, Thresholds};
use serde::Serialize;

/// `GET /api/dashboard` body.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Most recent reading, from the history buffer or the store.
    pub latest: Option<LiveReading>,
    /// Current thresholds.
    pub thresholds: Thresholds,
    /// Statistics over the last 24 hours of stored readings.
    pub stats_24h: Stats,
}

/// `POST /api/receive` body.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiveResponse {
    pub success: bool,
    /// Persisted record.
    pub leitura: Reading,
}

/// `POST /api/sensor-data` body.
#[derive(Debug, Clone, Serialize)]
pub struct SensorDataResponse {
    pub success: bool,
    /// Normalized live reading.
    pub data: LiveReading,
}

/// `GET /atualizar` body.
#[derive(Debug, Clone, Serialize)]
pub struct PollResponse {
    pub success: bool,
    /// Readings written to the store by this cycle.
    pub inserted: usize,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Error body for every failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// Live channel events (tagged enum for type safety).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum LiveEvent {
    /// Recent readings, oldest first (sent once on connect).
    History(Vec<LiveReading>),
    /// A reading was ingested.
    SensorUpdate(LiveReading),
    /// Thresholds changed.
    ThresholdUpdate(Thresholds),
}
