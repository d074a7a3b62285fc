//! Reading store for envwatch.
//!
//! Readings are append-only: written once by ingestion or the telemetry
//! poller, then only queried by recency or by time range. Two backends:
//! - `JsonLinesStore`: daily `.jsonl` files, durable across restarts
//! - `MemoryStore`: process-lifetime only (tests, `memory://`)

pub mod error;
pub mod memory;
pub mod store;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use memory::MemoryStore;
pub use store::{open_store, ReadingStore, SharedStore, StoreUri};
pub use writer::{JsonLinesStore, RESIDENT_HOURS};
