//! Driven ports (Outbound dependencies)

use crate::domain::ShardToBeaconBlock;
use async_trait::async_trait;
use shared_bus::BeaconEvent;
use shared_types::{CommitteeKey, Hash, ShardId};
use std::collections::BTreeMap;

/// Pool of validated shard-to-beacon summaries.
#[async_trait]
pub trait ShardToBeaconPool: Send + Sync {
    /// Blocks above each shard's last consumed height, in height order.
    ///
    /// Shards missing from `best_heights` start at height 1.
    async fn get_valid_blocks(
        &self,
        best_heights: &BTreeMap<ShardId, u64>,
    ) -> BTreeMap<ShardId, Vec<ShardToBeaconBlock>>;

    /// Drop everything at or below `heights`.
    async fn remove_consumed(&self, heights: BTreeMap<ShardId, u64>);
}

/// Signature checks for producers, beacon committees and shard committees.
///
/// Aggregate-signature cryptography lives behind this seam.
pub trait SignatureVerifier: Send + Sync {
    fn verify_producer_signature(
        &self,
        producer: &CommitteeKey,
        block_hash: &Hash,
        signature: &[u8],
    ) -> bool;

    /// Check `agg_sig` by the committee members at `validators_idx`.
    fn validate_agg_signature(
        &self,
        validators_idx: &[usize],
        committee: &[CommitteeKey],
        agg_sig: &[u8],
        r: &[u8],
        message: &Hash,
    ) -> Result<(), String>;
}

/// External random beacon.
#[async_trait]
pub trait RandomOracle: Send + Sync {
    /// Latest timestamp the oracle has produced a nonce for.
    async fn current_timestamp(&self) -> Result<i64, String>;

    /// First nonce at or after `timestamp`: `(btc_height, oracle_timestamp, nonce)`.
    async fn nonce_by_timestamp(&self, timestamp: i64) -> Result<(u64, i64, i64), String>;

    async fn verify_nonce(&self, timestamp: i64, nonce: i64) -> Result<bool, String>;
}

/// Block and best-state persistence.
#[async_trait]
pub trait BlockStorage: Send + Sync {
    async fn fetch_block_by_hash(&self, hash: &Hash) -> Result<Option<Vec<u8>>, String>;

    async fn has_block(&self, hash: &Hash) -> Result<bool, String>;

    /// Hash of the block last stored at `height`, if any.
    async fn block_hash_at_height(&self, height: u64) -> Result<Option<Hash>, String>;

    async fn store_block(&self, hash: Hash, height: u64, encoded: Vec<u8>) -> Result<(), String>;

    async fn store_best_state(&self, encoded: Vec<u8>) -> Result<(), String>;
}

/// Outbound notifications after commit.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: BeaconEvent) -> Result<(), String>;
}
