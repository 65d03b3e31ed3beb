//! # Event Publisher
//!
//! Publishing side of the bus.

use crate::events::{BeaconEvent, EventFilter};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Publishing interface handed to producers of events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// Returns the number of subscribers the event was delivered to.
    async fn publish(&self, event: BeaconEvent) -> usize;

    /// Total number of events published, delivered or not.
    fn events_published(&self) -> u64;
}

/// In-memory bus backed by `tokio::sync::broadcast`.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BeaconEvent>,
    events_published: AtomicU64,
    events_dropped: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Bus with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events matching `filter`.
    ///
    /// Only events published after this call are observed.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, min_height = ?filter.min_height, "New subscription");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Subscribe and wrap the handle as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events published while nobody was subscribed.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BeaconEvent) -> usize {
        let topic = event.topic();
        let height = event.height();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(?topic, height, receivers, "Event published");
                receivers
            }
            Err(_) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
                trace!(?topic, height, "Event dropped (no subscribers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
