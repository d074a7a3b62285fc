//! Store abstraction and backend selection.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use envwatch_core::Reading;
use tracing::info;

use crate::error::{PersistenceError, PersistenceResult};
use crate::memory::MemoryStore;
use crate::writer::JsonLinesStore;

/// Durable, append-only store of sensor readings.
///
/// Implementations guard their own state; callers share them behind an `Arc`.
pub trait ReadingStore: Send + Sync {
    /// Append one reading.
    fn append(&self, reading: &Reading) -> PersistenceResult<()>;

    /// Reading with the newest `created_at`, if any.
    fn latest(&self) -> PersistenceResult<Option<Reading>>;

    /// All readings with `created_at >= start`, oldest first.
    fn since(&self, start: DateTime<Utc>) -> PersistenceResult<Vec<Reading>>;

    /// Up to `limit` readings, newest first.
    fn recent(&self, limit: usize) -> PersistenceResult<Vec<Reading>>;
}

/// Store handle shared across tasks.
pub type SharedStore = Arc<dyn ReadingStore>;

/// Parsed store connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUri {
    /// `memory://`
    Memory,
    /// `file://<dir>` or a bare directory path.
    JsonLines(PathBuf),
}

impl StoreUri {
    pub fn parse(uri: &str) -> PersistenceResult<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(PersistenceError::InvalidUri("empty store URI".to_string()));
        }
        if uri == "memory://" || uri == "memory" {
            return Ok(Self::Memory);
        }
        if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(PersistenceError::InvalidUri(format!("missing path in '{uri}'")));
            }
            return Ok(Self::JsonLines(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(PersistenceError::InvalidUri(format!(
                "unsupported scheme '{scheme}'"
            )));
        }
        Ok(Self::JsonLines(PathBuf::from(uri)))
    }
}

/// Open the backend named by `uri`.
pub fn open_store(uri: &str) -> PersistenceResult<SharedStore> {
    match StoreUri::parse(uri)? {
        StoreUri::Memory => {
            info!("Using in-memory reading store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreUri::JsonLines(dir) => {
            let store = JsonLinesStore::open(&dir)?;
            info!(dir = %dir.display(), resident = store.len(), "Opened JSON Lines reading store");
            Ok(Arc::new(store))
        }
    }
}

// Query helpers shared by the backends. `readings` is sorted by
// `created_at`; equal timestamps stay in append order.

/// Insert keeping `readings` sorted. In-order appends land at the tail.
pub(crate) fn insert_sorted(readings: &mut Vec<Reading>, reading: Reading) {
    let at = readings.partition_point(|r| r.created_at <= reading.created_at);
    readings.insert(at, reading);
}

pub(crate) fn latest_of(readings: &[Reading]) -> Option<Reading> {
    readings.last().cloned()
}

pub(crate) fn since_of(readings: &[Reading], start: DateTime<Utc>) -> Vec<Reading> {
    let from = readings.partition_point(|r| r.created_at < start);
    readings[from..].to_vec()
}

pub(crate) fn recent_of(readings: &[Reading], limit: usize) -> Vec<Reading> {
    readings.iter().rev().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> Reading {
        Reading::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs),
            secs as f64,
            50.0,
            300.0,
        )
    }

    #[test]
    fn test_parse_uri() {
        assert_eq!(StoreUri::parse("memory://").unwrap(), StoreUri::Memory);
        assert_eq!(
            StoreUri::parse("file://./data/readings").unwrap(),
            StoreUri::JsonLines(PathBuf::from("./data/readings"))
        );
        assert_eq!(
            StoreUri::parse("/var/lib/envwatch").unwrap(),
            StoreUri::JsonLines(PathBuf::from("/var/lib/envwatch"))
        );
        assert!(matches!(
            StoreUri::parse("mongodb://localhost/sensors"),
            Err(PersistenceError::InvalidUri(_))
        ));
        assert!(StoreUri::parse("  ").is_err());
        assert!(StoreUri::parse("file://").is_err());
    }

    #[test]
    fn test_query_helpers_with_out_of_order_appends() {
        let mut readings = Vec::new();
        for r in [at(10), at(30), at(20), at(5)] {
            insert_sorted(&mut readings, r);
        }
        let order: Vec<f64> = readings.iter().map(|r| r.temperature).collect();
        assert_eq!(order, vec![5.0, 10.0, 20.0, 30.0]);

        assert_eq!(latest_of(&readings).unwrap().temperature, 30.0);

        let window: Vec<f64> = since_of(&readings, at(10).created_at)
            .iter()
            .map(|r| r.temperature)
            .collect();
        assert_eq!(window, vec![10.0, 20.0, 30.0]);

        let newest: Vec<f64> = recent_of(&readings, 2).iter().map(|r| r.temperature).collect();
        assert_eq!(newest, vec![30.0, 20.0]);

        assert!(latest_of(&[]).is_none());
        assert!(recent_of(&readings, 0).is_empty());
    }

    #[test]
    fn test_equal_timestamps_keep_append_order() {
        let first = at(10);
        let mut second = at(10);
        second.temperature = 99.0;

        let mut readings = Vec::new();
        insert_sorted(&mut readings, first);
        insert_sorted(&mut readings, second.clone());

        assert_eq!(latest_of(&readings), Some(second.clone()));
        assert_eq!(recent_of(&readings, 1), vec![second]);
    }

    #[test]
    fn test_open_memory_store() {
        let store = open_store("memory://").unwrap();
        store.append(&at(1)).unwrap();
        assert_eq!(store.recent(10).unwrap().len(), 1);
    }
}
