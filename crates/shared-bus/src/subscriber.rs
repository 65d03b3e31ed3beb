//! # Event Subscriber
//!
//! Receiving side of the bus.

use crate::events::{BeaconEvent, EventFilter};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::warn;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus was dropped.
    #[error("Event bus closed")]
    Closed,
}

/// A filtered subscription handle.
pub struct Subscription {
    receiver: broadcast::Receiver<BeaconEvent>,
    filter: EventFilter,
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<BeaconEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<BeaconEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => self.record_lag(count),
            }
        }
    }

    /// Next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Option<BeaconEvent>, BusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(BusError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => self.record_lag(count),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Events this subscriber missed because it fell behind.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    fn record_lag(&mut self, count: u64) {
        self.lagged += count;
        warn!(missed = count, "Subscriber lagged behind the bus");
    }
}

/// Filtered `Stream` over the bus.
pub struct EventStream {
    inner: BroadcastStream<BeaconEvent>,
    filter: EventFilter,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<BeaconEvent>, filter: EventFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = BeaconEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.filter.matches(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    warn!(missed = count, "Event stream lagged behind the bus");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
