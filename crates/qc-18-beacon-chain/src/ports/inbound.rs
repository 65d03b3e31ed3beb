//! Driving ports (Inbound API)

use crate::domain::{BeaconBestState, BeaconBlock, BeaconResult};
use async_trait::async_trait;
use shared_types::{CommitteeKey, Hash};
use std::sync::Arc;

/// Primary beacon chain API.
#[async_trait]
pub trait BeaconChainApi: Send + Sync {
    /// Assemble the next block for `proposer` at `round`.
    ///
    /// The returned block carries no producer signature or committee votes.
    async fn new_block(
        &self,
        proposer: &CommitteeKey,
        round: u32,
        start_time: i64,
    ) -> BeaconResult<BeaconBlock>;

    /// Full validation of a proposed block without committing it.
    ///
    /// Runs the aggregation and instruction-regeneration checks on top of
    /// everything [`BeaconChainApi::insert_block`] checks, minus committee
    /// votes.
    async fn verify_for_signing(&self, block: &BeaconBlock) -> BeaconResult<()>;

    /// Validate and commit a block.
    ///
    /// `already_validated` skips the committee signature check for blocks
    /// that passed [`BeaconChainApi::verify_for_signing`] locally.
    /// Inserting the current best block again is a no-op.
    async fn insert_block(&self, block: BeaconBlock, already_validated: bool) -> BeaconResult<()>;

    /// Snapshot of the canonical state.
    fn best_state(&self) -> Arc<BeaconBestState>;

    fn best_block_hash(&self) -> Hash;
}
