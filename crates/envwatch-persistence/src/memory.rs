//! In-memory reading store.

use chrono::{DateTime, Utc};
use envwatch_core::Reading;
use parking_lot::RwLock;

use crate::error::PersistenceResult;
use crate::store::{insert_sorted, latest_of, recent_of, since_of, ReadingStore};

/// Reading store that lives for the process lifetime only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Sorted by `created_at`.
    readings: RwLock<Vec<Reading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }
}

impl ReadingStore for MemoryStore {
    fn append(&self, reading: &Reading) -> PersistenceResult<()> {
        insert_sorted(&mut self.readings.write(), reading.clone());
        Ok(())
    }

    fn latest(&self) -> PersistenceResult<Option<Reading>> {
        Ok(latest_of(&self.readings.read()))
    }

    fn since(&self, start: DateTime<Utc>) -> PersistenceResult<Vec<Reading>> {
        Ok(since_of(&self.readings.read(), start))
    }

    fn recent(&self, limit: usize) -> PersistenceResult<Vec<Reading>> {
        Ok(recent_of(&self.readings.read(), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_append_and_query() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(store.latest().unwrap().is_none());

        let now = Utc::now();
        let old = Reading::new(now - Duration::hours(30), 18.0, 60.0, 100.0);
        let fresh = Reading::new(now - Duration::hours(1), 22.0, 50.0, 300.0);
        // Out of order on purpose
        store.append(&fresh).unwrap();
        store.append(&old).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.latest().unwrap(), Some(fresh.clone()));
        assert_eq!(store.since(now - Duration::hours(24)).unwrap(), vec![fresh.clone()]);
        assert_eq!(store.recent(10).unwrap(), vec![fresh, old]);
    }
}
