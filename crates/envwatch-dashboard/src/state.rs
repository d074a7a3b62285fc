//! Dashboard state management.
//!
//! DashboardState bundles the shared handles every handler needs: the
//! threshold registry, the recent-history buffer, the reading store, the
//! live channel and (optionally) the telemetry poller.

use std::sync::Arc;

use chrono::Utc;
use envwatch_core::{
    LiveReading, PartialThresholds, RecentHistory, SharedHistory, Thresholds, ThresholdRegistry,
    HISTORY_CAPACITY,
};
use envwatch_feed::Poller;
use envwatch_persistence::SharedStore;
use envwatch_telemetry::Metrics;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::aggregate::{aggregate, stats_window_start};
use crate::broadcast::{Broadcaster, BOOTSTRAP_SIZE};
use crate::error::{DashboardError, DashboardResult};
use crate::types::{DashboardSnapshot, LiveEvent};

/// Shared state behind every handler. Cloning is cheap.
#[derive(Clone)]
pub struct DashboardState {
    thresholds: ThresholdRegistry,
    history: SharedHistory,
    store: SharedStore,
    broadcaster: Broadcaster,
    /// None when no telemetry channel is configured.
    poller: Option<Arc<Poller>>,
}

impl DashboardState {
    pub fn new(store: SharedStore, thresholds: Thresholds, broadcaster: Broadcaster) -> Self {
        Self {
            thresholds: ThresholdRegistry::new(thresholds),
            history: RecentHistory::shared(HISTORY_CAPACITY),
            store,
            broadcaster,
            poller: None,
        }
    }

    /// Attach the telemetry poller used by the on-demand sync endpoint.
    pub fn with_poller(mut self, poller: Arc<Poller>) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn thresholds(&self) -> &ThresholdRegistry {
        &self.thresholds
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn poller(&self) -> Option<&Arc<Poller>> {
        self.poller.as_ref()
    }

    /// Most recent reading: the history buffer first, then the store.
    pub fn latest(&self) -> DashboardResult<Option<LiveReading>> {
        if let Some(live) = self.history.read().latest() {
            return Ok(Some(live));
        }

        let thresholds = self.thresholds.get();
        let record = self.store.latest().map_err(|e| {
            Metrics::store_error("query");
            DashboardError::StoreQuery(e)
        })?;
        Ok(record.map(|r| LiveReading::from_record(&r, &thresholds)))
    }

    /// Latest reading, current thresholds and 24h statistics.
    pub fn collect_snapshot(&self) -> DashboardResult<DashboardSnapshot> {
        let thresholds = self.thresholds.get();
        let latest = self.latest()?;
        let stats_24h = aggregate(self.store.as_ref(), stats_window_start(Utc::now()), &thresholds)?;

        Ok(DashboardSnapshot {
            latest,
            thresholds,
            stats_24h,
        })
    }

    /// Merge `partial` into the thresholds and announce the result.
    ///
    /// Already-buffered readings keep the alert flag they were created with.
    /// An empty `partial` changes nothing but is still announced.
    pub fn update_thresholds(&self, partial: PartialThresholds) -> Thresholds {
        if partial.is_empty() {
            debug!("Threshold update carried no fields");
        }
        let updated = self.thresholds.set(partial);
        Metrics::threshold_updated();
        info!(
            temperature_max = updated.temperature_max,
            humidity_min = updated.humidity_min,
            light_min = updated.light_min,
            "Thresholds updated"
        );
        self.broadcaster.publish(&LiveEvent::ThresholdUpdate(updated));
        updated
    }

    /// Join the live channel: a receiver plus the bootstrap history (last
    /// `BOOTSTRAP_SIZE` readings, oldest first).
    ///
    /// Both are taken under the buffer read lock. Ingestion publishes while
    /// holding the write lock, so a reading is either in the bootstrap or
    /// delivered on the receiver, never both.
    pub fn join_live_channel(&self) -> (broadcast::Receiver<String>, LiveEvent) {
        let history = self.history.read();
        let rx = self.broadcaster.subscribe();
        (rx, LiveEvent::History(history.slice(BOOTSTRAP_SIZE)))
    }

    /// Buffered readings, oldest first.
    pub fn recent_history(&self) -> Vec<LiveReading> {
        let history = self.history.read();
        history.slice(history.len())
    }
}
