//! Event bus adapters.

use crate::ports::EventBus;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{BeaconEvent, EventPublisher};
use std::sync::Arc;
use tracing::trace;

/// Forwards beacon events onto a shared-bus publisher.
pub struct BusEventPublisher<P: EventPublisher> {
    inner: Arc<P>,
}

impl<P: EventPublisher> BusEventPublisher<P> {
    pub fn new(inner: Arc<P>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: EventPublisher + 'static> EventBus for BusEventPublisher<P> {
    async fn publish(&self, event: BeaconEvent) -> Result<(), String> {
        let delivered = self.inner.publish(event).await;
        trace!(delivered, "Forwarded beacon event");
        Ok(())
    }
}

/// Keeps every published event, for tests.
#[derive(Default)]
pub struct RecordingEventBus {
    events: RwLock<Vec<BeaconEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<BeaconEvent> {
        self.events.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn publish(&self, event: BeaconEvent) -> Result<(), String> {
        self.events.write().push(event);
        Ok(())
    }
}
