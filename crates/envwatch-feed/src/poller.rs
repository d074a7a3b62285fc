//! Scheduled telemetry polling.

use std::time::Duration;

use envwatch_persistence::SharedStore;
use envwatch_telemetry::Metrics;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::ThingSpeakClient;
use crate::config::PollerConfig;
use crate::error::FeedResult;

/// Pulls the latest channel entries into the reading store.
pub struct Poller {
    client: ThingSpeakClient,
    store: SharedStore,
    results: u32,
    interval: Duration,
}

impl Poller {
    pub fn new(client: ThingSpeakClient, store: SharedStore, results: u32, interval: Duration) -> Self {
        Self {
            client,
            store,
            results,
            interval,
        }
    }

    /// Build a poller from configuration. Fails when no channel is configured.
    pub fn from_config(config: &PollerConfig, store: SharedStore) -> FeedResult<Self> {
        let client = ThingSpeakClient::from_config(config)?;
        Ok(Self::new(
            client,
            store,
            config.results,
            Duration::from_secs(config.interval_secs.max(1)),
        ))
    }

    /// Run one poll cycle and return the number of readings stored.
    ///
    /// Entries that do not map to a reading are skipped and logged. A store
    /// failure aborts the cycle.
    pub async fn run_cycle(&self) -> FeedResult<usize> {
        let result = self.poll_once().await;
        Metrics::poll_cycle(result.is_ok());
        result
    }

    async fn poll_once(&self) -> FeedResult<usize> {
        let entries = self.client.fetch_feeds(self.results).await?;

        let mut stored = 0usize;
        for entry in &entries {
            let reading = match entry.to_reading() {
                Ok(reading) => reading,
                Err(e) => {
                    warn!(entry_id = ?entry.entry_id, error = %e, "Skipping unusable feed entry");
                    continue;
                }
            };

            if let Err(e) = self.store.append(&reading) {
                Metrics::store_error("append");
                return Err(e.into());
            }
            stored += 1;
        }

        Metrics::readings_accepted("poller", stored as u64);
        debug!(fetched = entries.len(), stored, "Poll cycle complete");
        Ok(stored)
    }

    /// Poll forever on the configured interval.
    ///
    /// The first cycle runs immediately. Failures are logged and the timer
    /// keeps going; there is no retry within a tick.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            results = self.results,
            "Starting telemetry poller"
        );

        loop {
            interval.tick().await;
            match self.run_cycle().await {
                Ok(stored) => info!(stored, "Telemetry poll stored readings"),
                Err(e) => warn!(error = %e, "Telemetry poll failed"),
            }
        }
    }
}
