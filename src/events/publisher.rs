//! # Runtime Event Publishing
//!
//! Lifecycle notifications such as `actor.started` and `signal.dispatched` fan out
//! over a tokio broadcast channel. Subscribers that fall behind lose the
//! oldest events, publishers never wait.
//!
//! ```rust
//! use serde_json::json;
//! use signalbridge_core::events::EventPublisher;
//!
//! # tokio_test::block_on(async {
//! let publisher = EventPublisher::new(16);
//! let mut events = publisher.subscribe();
//!
//! assert_eq!(publisher.publish("actor.started", json!({ "actor_id": "a1" })), 1);
//! let event = events.recv().await.unwrap();
//! assert_eq!(event.name, "actor.started");
//! # });
//! ```

use serde_json::Value;
use tokio::sync::broadcast;

use crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY;

/// Broadcast publisher for runtime lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context
    ///
    /// Returns how many subscribers received it. Publishing with nobody
    /// subscribed is not an error.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) -> usize {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
