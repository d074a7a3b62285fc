//! Bounded buffer of the most recent live readings.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::reading::LiveReading;

/// Number of live readings kept in memory.
pub const HISTORY_CAPACITY: usize = 100;

/// History buffer shared between the ingestion path and the dashboard.
pub type SharedHistory = Arc<RwLock<RecentHistory>>;

/// FIFO of the last `capacity` live readings, oldest at the front.
#[derive(Debug, Clone)]
pub struct RecentHistory {
    entries: VecDeque<LiveReading>,
    capacity: usize,
}

impl Default for RecentHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl RecentHistory {
    /// Create an empty buffer. A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Wrap a new buffer for sharing.
    pub fn shared(capacity: usize) -> SharedHistory {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    /// Append a reading, evicting the oldest entries beyond capacity.
    pub fn push(&mut self, reading: LiveReading) {
        self.entries.push_back(reading);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Most recently pushed reading.
    pub fn latest(&self) -> Option<LiveReading> {
        self.entries.back().cloned()
    }

    /// Last `n` readings, oldest first.
    pub fn slice(&self, n: usize) -> Vec<LiveReading> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_reading(i: i64) -> LiveReading {
        LiveReading {
            device_id: format!("dev-{i}"),
            temperature: i as f64,
            humidity: 50.0,
            light: 300.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(i),
            alert: false,
        }
    }

    #[test]
    fn test_push_grows_until_capacity() {
        let mut history = RecentHistory::default();
        assert!(history.is_empty());
        assert!(history.latest().is_none());

        history.push(make_reading(1));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest(), Some(make_reading(1)));

        history.push(make_reading(2));
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest(), Some(make_reading(2)));
    }

    #[test]
    fn test_eviction_keeps_most_recent_in_order() {
        let mut history = RecentHistory::default();
        for i in 0..250 {
            history.push(make_reading(i));
        }

        assert_eq!(history.len(), HISTORY_CAPACITY);
        let all = history.slice(HISTORY_CAPACITY);
        let temps: Vec<f64> = all.iter().map(|r| r.temperature).collect();
        let expected: Vec<f64> = (150..250).map(|i| i as f64).collect();
        assert_eq!(temps, expected);
    }

    #[test]
    fn test_slice_returns_tail_oldest_first() {
        let mut history = RecentHistory::new(10);
        for i in 0..8 {
            history.push(make_reading(i));
        }

        let tail = history.slice(3);
        assert_eq!(tail, vec![make_reading(5), make_reading(6), make_reading(7)]);

        // Asking for more than stored returns everything
        assert_eq!(history.slice(50).len(), 8);
        assert!(history.slice(0).is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut history = RecentHistory::new(0);
        history.push(make_reading(1));
        history.push(make_reading(2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.slice(5), vec![make_reading(2)]);
    }
}
