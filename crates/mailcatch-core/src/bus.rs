//! In-process event bus.
//!
//! Fan-out for domain events inside one process: the lifecycle coordinator
//! consumes notifications from it and publishes bind results back onto it,
//! and the service wiring bridges bus events to the remote process.

use tokio::sync::broadcast;

use crate::Event;

/// Buffered events per subscriber before older ones are dropped.
const DEFAULT_CAPACITY: usize = 64;

/// Broadcast bus for [`Event`] values.
///
/// Cloning is cheap; all clones publish into the same channel. Subscribers
/// that fall behind by more than the capacity miss the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a bus with the given per-subscriber capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was delivered to. An
    /// event published with no subscribers is dropped.
    pub fn publish(&self, event: Event) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!(kind, "event dropped, no subscribers");
                0
            }
        }
    }

    /// Registers a new subscriber.
    ///
    /// Only events published after this call are observed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
