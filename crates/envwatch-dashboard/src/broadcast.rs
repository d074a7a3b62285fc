//! Live channel fan-out.
//!
//! Events are serialized once and pushed through a tokio broadcast channel;
//! every connected WebSocket client holds its own receiver.

use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::types::LiveEvent;

/// Number of history entries sent to a client when it connects.
pub const BOOTSTRAP_SIZE: usize = 50;

/// Publisher side of the live channel.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    /// `capacity` is the per-subscriber backlog before a slow client lags.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event to all current subscribers and return how many
    /// received it. Zero subscribers is not an error.
    pub fn publish(&self, event: &LiveEvent) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, "Failed to serialize live event");
                return 0;
            }
        };

        match self.tx.send(json) {
            Ok(n) => {
                trace!(receivers = n, "Live event sent");
                n
            }
            Err(_) => {
                // No receivers - this is normal when no clients connected
                trace!("No live channel receivers connected");
                0
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envwatch_core::Thresholds;

    #[test]
    fn test_broadcast_channel() {
        let broadcaster = Broadcaster::new(16);

        // Subscribe before sending
        let mut rx = broadcaster.subscribe();
        let reached = broadcaster.publish(&LiveEvent::ThresholdUpdate(Thresholds::default()));
        assert_eq!(reached, 1);

        let msg = tokio_test::assert_ok!(rx.try_recv());
        assert!(msg.starts_with("{\"event\":\"threshold-update\""));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = Broadcaster::default();
        assert_eq!(broadcaster.receiver_count(), 0);
        assert_eq!(
            broadcaster.publish(&LiveEvent::ThresholdUpdate(Thresholds::default())),
            0
        );
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let broadcaster = Broadcaster::new(4);
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        assert_eq!(broadcaster.publish(&LiveEvent::History(Vec::new())), 2);
        assert_eq!(a.recv().await.unwrap(), b.recv().await.unwrap());
    }
}
