//! # Integration Tests
//!
//! The beacon chain core wired to the real shared bus and the in-memory
//! adapters the devnet runtime uses.

#[cfg(test)]
pub(crate) mod fixtures;

pub mod epoch_cycle;
pub mod notifications;
pub mod pipeline;
