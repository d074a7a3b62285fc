//! Prometheus metrics for envwatch.
//!
//! Covers:
//! - Readings accepted (device push vs. poller) and rejected
//! - Alerts raised at ingestion time
//! - Store failures
//! - Telemetry poll cycles
//! - Live channel subscribers and threshold changes
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a programming error and should crash at first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Readings accepted into the store.
/// Labels: source (device/poller)
pub static READINGS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "envwatch_readings_total",
        "Total readings accepted",
        &["source"]
    )
    .unwrap()
});

/// Payloads rejected by validation.
/// Labels: kind (reading/thresholds)
pub static VALIDATION_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "envwatch_validation_rejected_total",
        "Total payloads rejected by validation",
        &["kind"]
    )
    .unwrap()
});

/// Readings flagged as alerts when ingested.
pub static ALERTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "envwatch_alerts_total",
        "Total readings flagged as alerts at ingestion"
    )
    .unwrap()
});

/// Store failures.
/// Labels: operation (append/query)
pub static STORE_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "envwatch_store_errors_total",
        "Total reading store failures",
        &["operation"]
    )
    .unwrap()
});

/// Telemetry poll cycles.
/// Labels: outcome (ok/error)
pub static POLL_CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "envwatch_poll_cycles_total",
        "Total telemetry poll cycles",
        &["outcome"]
    )
    .unwrap()
});

/// Connected live channel subscribers.
pub static LIVE_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "envwatch_live_subscribers",
        "Currently connected live channel subscribers"
    )
    .unwrap()
});

/// Entries in the recent-history buffer.
pub static HISTORY_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "envwatch_history_size",
        "Readings held in the recent-history buffer"
    )
    .unwrap()
});

/// Threshold updates applied.
pub static THRESHOLD_UPDATES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "envwatch_threshold_updates_total",
        "Total threshold updates applied"
    )
    .unwrap()
});

/// Metrics recorder facade.
pub struct Metrics;

impl Metrics {
    /// Record a reading accepted from `source`.
    pub fn reading_accepted(source: &str) {
        READINGS_TOTAL.with_label_values(&[source]).inc();
    }

    /// Record several readings accepted from `source`.
    pub fn readings_accepted(source: &str, count: u64) {
        READINGS_TOTAL.with_label_values(&[source]).inc_by(count);
    }

    /// Record a payload rejected by validation.
    pub fn validation_rejected(kind: &str) {
        VALIDATION_REJECTED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record an alert raised at ingestion.
    pub fn alert_raised() {
        ALERTS_TOTAL.inc();
    }

    /// Record a store failure.
    pub fn store_error(operation: &str) {
        STORE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }

    /// Record a poll cycle outcome.
    pub fn poll_cycle(ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        POLL_CYCLES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a live subscriber connecting.
    pub fn subscriber_connected() {
        LIVE_SUBSCRIBERS.inc();
    }

    /// Record a live subscriber disconnecting.
    pub fn subscriber_disconnected() {
        LIVE_SUBSCRIBERS.dec();
    }

    /// Set the history buffer size.
    pub fn history_size(len: usize) {
        HISTORY_SIZE.set(len as i64);
    }

    /// Record a threshold update.
    pub fn threshold_updated() {
        THRESHOLD_UPDATES_TOTAL.inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
