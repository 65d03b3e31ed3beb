//! Domain layer for the beacon chain.
//!
//! - block / shard_summary: wire entities
//! - instruction: positional instruction codec
//! - best_state / committee: state transition and rotation
//! - epoch / shuffle: randomness-phase bookkeeping
//! - hashing: root and Merkle commitments
//! - genesis: height 1 construction

mod best_state;
mod block;
mod committee;
mod epoch;
mod error;
mod genesis;
mod hashing;
mod instruction;
mod params;
mod shard_summary;
mod shuffle;

#[cfg(test)]
pub(crate) mod test_support;

pub use best_state::*;
pub use block::*;
pub use committee::*;
pub use epoch::*;
pub use error::*;
pub use genesis::*;
pub use hashing::*;
pub use instruction::*;
pub use params::*;
pub use shard_summary::*;
pub use shuffle::*;
