//! Main application orchestration.
//!
//! Coordinates all components:
//! - Reading store
//! - Telemetry poller (when a channel is configured)
//! - Dashboard HTTP server and live channel

use std::sync::Arc;

use envwatch_dashboard::{run_server, Broadcaster, DashboardState};
use envwatch_feed::Poller;
use envwatch_persistence::open_store;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Ok(Self { config })
    }

    /// Assemble the shared state: store, thresholds, live channel and poller.
    ///
    /// Returns the poller separately so the caller can schedule it.
    pub fn build_state(&self) -> AppResult<(DashboardState, Option<Arc<Poller>>)> {
        let store = open_store(&self.config.store.uri)?;
        let broadcaster = Broadcaster::new(self.config.server.channel_capacity);
        let state = DashboardState::new(store.clone(), self.config.thresholds, broadcaster);

        if !self.config.poller.is_enabled() {
            info!("Telemetry poller disabled (no channel configured)");
            return Ok((state, None));
        }

        let poller = Arc::new(Poller::from_config(&self.config.poller, store)?);
        Ok((state.with_poller(Arc::clone(&poller)), Some(poller)))
    }

    /// Run until the server fails or a shutdown signal arrives.
    pub async fn run(self) -> AppResult<()> {
        let (state, poller) = self.build_state()?;

        let poller_handle = poller.map(|poller| tokio::spawn(async move { poller.run().await }));

        info!(
            addr = %self.config.server.bind_addr(),
            store = %self.config.store.uri,
            poller = poller_handle.is_some(),
            "envwatch ready"
        );

        let result = tokio::select! {
            result = run_server(state, self.config.server.clone()) => {
                result.map_err(|e| {
                    error!(error = %e, "Dashboard server failed");
                    AppError::Server(e.to_string())
                })
            }

            // Handle shutdown signal
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        if let Some(handle) = poller_handle {
            handle.abort();
        }
        info!("Shutting down");

        result
    }
}
