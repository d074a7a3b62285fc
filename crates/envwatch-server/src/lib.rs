//! envwatch - environmental sensor monitoring service.
//!
//! Main application that wires all components together:
//! - Reading store (JSON Lines files or in-memory)
//! - Telemetry channel poller
//! - Ingestion API, live channel and dashboard page

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, StoreConfig};
pub use error::{AppError, AppResult};
