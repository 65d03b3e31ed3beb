//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `CommitteeKey`, `ShardId`
//! - **Cross-shard**: `ShardStateRecord`
//! - **Bus payloads**: `BeaconBlockSummary`, `BestStateSummary`, `CommitteeSnapshot`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A 32-byte hash.
pub type Hash = [u8; 32];

/// Identifier of a shard chain.
pub type ShardId = u8;

/// Maximum accepted length of an encoded committee key.
pub const MAX_KEY_LENGTH: usize = 256;

/// Encoded public key of a committee member or candidate.
///
/// Keys travel through the instruction wire format as comma-joined strings,
/// so a well-formed key never contains a comma or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitteeKey(String);

impl CommitteeKey {
    /// Wrap an encoded key without checking it.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty, bounded, printable ASCII without commas.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_KEY_LENGTH
            && self.0.chars().all(|c| c.is_ascii_graphic() && c != ',')
    }
}

impl fmt::Display for CommitteeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitteeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CommitteeKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CommitteeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One shard block as recorded in a beacon block body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStateRecord {
    /// Shard block height.
    pub height: u64,
    /// Shard block hash.
    pub hash: Hash,
    /// Cross-shard bitmap, carried opaquely.
    pub cross_shard: Vec<u8>,
    /// Proposal time of the shard block.
    pub propose_time: i64,
}

/// Notification payload for a committed beacon block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockSummary {
    pub hash: Hash,
    pub height: u64,
    pub epoch: u64,
    pub round: u32,
    pub producer: CommitteeKey,
    pub timestamp: i64,
    pub instruction_count: usize,
    /// Highest shard height consumed by this block, per shard.
    pub shard_heights: BTreeMap<ShardId, u64>,
}

/// Notification payload for a new canonical best state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestStateSummary {
    pub best_block_hash: Hash,
    pub height: u64,
    pub epoch: u64,
    pub proposer_index: usize,
    pub current_random_number: i64,
    pub is_get_random_number: bool,
    pub beacon_committee_size: usize,
    pub beacon_pending_size: usize,
}

/// Committee membership after a block changed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeSnapshot {
    pub height: u64,
    pub epoch: u64,
    pub beacon_committee: Vec<CommitteeKey>,
    pub beacon_pending: Vec<CommitteeKey>,
    pub shard_committees: BTreeMap<ShardId, Vec<CommitteeKey>>,
    pub shard_pending: BTreeMap<ShardId, Vec<CommitteeKey>>,
}
