//! In-memory adapters for the outbound ports.
//!
//! Suitable for tests and single-node devnets; production deployments wire
//! real storage, pool and oracle implementations behind the same traits.

mod event_bus;
mod oracle;
mod shard_pool;
mod signature;
mod storage;

pub use event_bus::*;
pub use oracle::*;
pub use shard_pool::*;
pub use signature::*;
pub use storage::*;
