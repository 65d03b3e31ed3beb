//! # Shared Bus - Beacon Notification Bus
//!
//! Carries post-commit notifications from the beacon chain core to the
//! gossip, relay and committee-change consumers.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌──────────────┐
//! │ Beacon core  │ ────────────→ │  Event Bus   │ ────────────→ │  Consumers   │
//! └──────────────┘               └──────────────┘               └──────────────┘
//! ```
//!
//! Publishing never blocks on consumers: a slow subscriber lags and loses the
//! oldest events instead of stalling the committing task.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{BeaconEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, BusError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
