//! envwatch-dashboard - Ingestion, live channel and HTTP API for envwatch.
//!
//! This crate owns everything that happens after a reading reaches the
//! service:
//!
//! - Ingestion pipeline (validate, flag alerts, persist, buffer, broadcast)
//! - Rolling 24h statistics over the reading store
//! - REST API and the static dashboard page
//! - WebSocket live channel with a history bootstrap on connect
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   POST /api/receive    ┌──────────────────────────────┐
//! │  devices   │ ─────────────────────▶ │ ingest()                     │
//! └────────────┘   POST /api/sensor-data│  thresholds ─▶ alert flag    │
//!                                       │  store.append()              │
//! ┌────────────┐   GET /atualizar       │  history.push()              │
//! │  Poller    │ ─────▶ store.append()  │  broadcaster.publish()       │
//! └────────────┘                        └──────────────┬───────────────┘
//!                                                      ▼
//!                                       ┌──────────────────────────────┐
//!                                       │ GET /ws  (history, updates)  │
//!                                       │ GET /api/dashboard (stats)   │
//!                                       └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use envwatch_dashboard::{Broadcaster, DashboardConfig, DashboardState, run_server};
//!
//! let state = DashboardState::new(store, Thresholds::default(), Broadcaster::default());
//! tokio::spawn(async move {
//!     if let Err(e) = run_server(state, DashboardConfig::default()).await {
//!         tracing::error!(error = %e, "Dashboard server failed");
//!     }
//! });
//! ```

mod aggregate;
mod broadcast;
mod config;
mod error;
mod ingest;
mod server;
mod state;
mod types;

pub use aggregate::{aggregate, stats_window_start, STATS_WINDOW_HOURS};
pub use broadcast::{Broadcaster, BOOTSTRAP_SIZE};
pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use ingest::{ingest, Ingested};
pub use server::{create_router, run_server, serve, AppState, RECENT_READINGS_LIMIT};
pub use state::DashboardState;
pub use types::{
    DashboardSnapshot, ErrorBody, HealthResponse, LiveEvent, PollResponse, ReceiveResponse,
    SensorDataResponse,
};
