//! Third-party telemetry feed for envwatch.
//!
//! Pulls the latest entries of a ThingSpeak-style channel on a fixed timer and
//! writes them straight into the reading store. Polled readings skip the
//! ingestion pipeline: no alert evaluation, no history buffer, no broadcast.

pub mod client;
pub mod config;
pub mod error;
pub mod poller;

pub use client::{FeedEntry, ThingSpeakClient};
pub use config::PollerConfig;
pub use error::{FeedError, FeedResult};
pub use poller::Poller;
