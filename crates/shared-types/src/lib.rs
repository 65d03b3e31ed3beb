//! # Shared Types Crate
//!
//! Types shared by every crate of the beacon node.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: committee keys, hashes and shard-state
//!   records are defined once and reused by the core, the bus and the runtime.
//! - **Canonical Hashing**: every content hash goes through [`hashing`], so
//!   all nodes derive bit-identical roots from the same inputs.

pub mod entities;
pub mod hashing;

pub use entities::*;
pub use hashing::*;
