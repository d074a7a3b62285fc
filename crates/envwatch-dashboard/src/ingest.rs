//! Reading ingestion pipeline.
//!
//! Every accepted payload is validated, evaluated against the current
//! thresholds, persisted, pushed into the recent-history buffer and broadcast
//! to live viewers, in that order. A store failure does not stop the reading
//! from reaching the buffer and the live channel; the caller still sees the
//! error.

use chrono::Utc;
use envwatch_core::{IncomingReading, LiveReading, Reading};
use envwatch_telemetry::Metrics;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{DashboardError, DashboardResult};
use crate::state::DashboardState;
use crate::types::LiveEvent;

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// Normalized reading as buffered and broadcast.
    pub live: LiveReading,
    /// Record written to the store.
    pub record: Reading,
}

/// Ingest one device payload.
pub fn ingest(state: &DashboardState, body: &Value) -> DashboardResult<Ingested> {
    let incoming = IncomingReading::from_json(body).map_err(|e| {
        Metrics::validation_rejected("reading");
        debug!(error = %e, "Rejected reading payload");
        DashboardError::from(e)
    })?;

    let thresholds = state.thresholds().get();
    let live = LiveReading::normalize(incoming, &thresholds, Utc::now());
    let record = Reading::from_live(&live);

    let persisted = state.store().append(&record);

    // Published under the buffer lock so a joining client sees each reading
    // exactly once, either in its bootstrap or as an update
    let receivers = {
        let mut history = state.history().write();
        history.push(live.clone());
        Metrics::history_size(history.len());
        state
            .broadcaster()
            .publish(&LiveEvent::SensorUpdate(live.clone()))
    };

    if live.alert {
        Metrics::alert_raised();
        warn!(
            device_id = %live.device_id,
            temperature = live.temperature,
            humidity = live.humidity,
            light = live.light,
            "Reading outside thresholds"
        );
    }

    match persisted {
        Ok(()) => {
            Metrics::reading_accepted("device");
            debug!(
                id = %record.id,
                device_id = %live.device_id,
                receivers,
                "Reading ingested"
            );
            Ok(Ingested { live, record })
        }
        Err(e) => {
            Metrics::store_error("append");
            error!(device_id = %live.device_id, error = %e, "Failed to persist reading");
            Err(DashboardError::Persistence(e))
        }
    }
}
