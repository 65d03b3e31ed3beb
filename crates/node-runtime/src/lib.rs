//! # Node Runtime Library
//!
//! Exposes the runtime's building blocks for testing. The main entry point
//! is the `main.rs` binary.
//!
//! - `container/` - configuration and adapter wiring
//! - `genesis/` - devnet key sets and the genesis block
//! - `handlers/` - bus logging, synthetic shard feed and the producer loop

#![allow(clippy::type_complexity)]

pub mod container;
pub mod genesis;
pub mod handlers;

pub use container::{BeaconContainer, DevnetConfig, DevnetService, NodeConfig};
pub use handlers::{DevnetProducer, EventLogHandler, ShardFeed};
