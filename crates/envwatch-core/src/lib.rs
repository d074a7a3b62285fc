//! Core domain types for envwatch.
//!
//! This crate provides the pieces of the ingestion pipeline that carry state
//! or rules but no I/O:
//! - `Reading`, `LiveReading`: persisted and normalized sensor readings
//! - `IncomingReading`: validated device payload
//! - `Thresholds`, `ThresholdRegistry`: alert boundaries and their shared cell
//! - `RecentHistory`: bounded FIFO of the most recent live readings
//! - `Stats`: rolling-window statistics over stored readings

pub mod error;
pub mod history;
pub mod reading;
pub mod stats;
pub mod thresholds;

pub use error::{CoreError, Result};
pub use history::{RecentHistory, SharedHistory, HISTORY_CAPACITY};
pub use reading::{IncomingReading, LiveReading, Reading, DEFAULT_DEVICE_ID, MAX_DEVICE_ID_LEN};
pub use stats::Stats;
pub use thresholds::{PartialThresholds, ThresholdRegistry, Thresholds};
