//! Rolling statistics over stored readings.

use chrono::{DateTime, Duration, Utc};
use envwatch_core::{Stats, Thresholds};
use envwatch_persistence::ReadingStore;
use envwatch_telemetry::Metrics;
use tracing::debug;

use crate::error::{DashboardError, DashboardResult};

/// Length of the statistics window.
pub const STATS_WINDOW_HOURS: i64 = 24;

/// Start of the statistics window ending at `now`.
pub fn stats_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(STATS_WINDOW_HOURS)
}

/// Statistics for every stored reading created at or after `window_start`.
///
/// Alerts are counted against `thresholds`, not the thresholds in effect
/// when each reading arrived.
pub fn aggregate(
    store: &dyn ReadingStore,
    window_start: DateTime<Utc>,
    thresholds: &Thresholds,
) -> DashboardResult<Stats> {
    let readings = store.since(window_start).map_err(|e| {
        Metrics::store_error("query");
        DashboardError::StoreQuery(e)
    })?;

    let stats = Stats::compute(&readings, thresholds);
    debug!(
        window_start = %window_start,
        total = stats.total_readings,
        alerts = stats.alerts,
        "Aggregated readings"
    );
    Ok(stats)
}
