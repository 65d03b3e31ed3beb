//! Single-producer devnet loop.
//!
//! The node holds every beacon key, so each step produces as the round-1
//! proposer, signs with the dev scheme, re-verifies the block as a signer
//! would and inserts it with full vote checks.

use super::ShardFeed;
use crate::container::DevnetService;
use qc_18_beacon_chain::{BeaconBlock, BeaconChainApi, BeaconError, BeaconResult, FixedRandomOracle};
use std::sync::Arc;
use tracing::debug;

pub struct DevnetProducer {
    service: Arc<DevnetService>,
    oracle: Arc<FixedRandomOracle>,
    feed: ShardFeed,
}

impl DevnetProducer {
    pub fn new(service: Arc<DevnetService>, oracle: Arc<FixedRandomOracle>, feed: ShardFeed) -> Self {
        Self {
            service,
            oracle,
            feed,
        }
    }

    /// Produce, verify and insert one block at wall-clock `now`.
    pub async fn step(&mut self, now: i64) -> BeaconResult<BeaconBlock> {
        let state = self.service.best_state();
        let timestamp = now.max(state.best_block_timestamp + 1);
        let height = state.beacon_height + 1;

        self.feed.tick(height, timestamp);
        self.oracle.set_timestamp(timestamp);

        let proposer = state
            .producer_for_round(1)
            .cloned()
            .ok_or_else(|| BeaconError::Transition("beacon committee is empty".into()))?;
        let mut block = self.service.new_block(&proposer, 1, timestamp).await?;
        sign(&mut block, state.beacon_committee.len());

        self.service.verify_for_signing(&block).await?;
        self.service.insert_block(block.clone(), false).await?;
        debug!(height, producer = %proposer, "Devnet step complete");
        Ok(block)
    }
}

/// Dev signatures: the producer's key bytes and a bare majority of votes.
fn sign(block: &mut BeaconBlock, committee_size: usize) {
    block.producer_signature = block.header.producer.as_str().as_bytes().to_vec();
    block.votes.validators_idx = (0..committee_size / 2 + 1).collect();
    block.votes.agg_sig = vec![1];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{BeaconContainer, NodeConfig};

    async fn producer() -> (BeaconContainer, DevnetProducer) {
        let container = BeaconContainer::new(NodeConfig::default(), 1_000).await.unwrap();
        let feed = ShardFeed::new(
            Arc::clone(&container.shard_pool),
            &container.config.beacon,
            container.config.devnet.stake_every,
        );
        let producer = DevnetProducer::new(
            Arc::clone(&container.service),
            Arc::clone(&container.oracle),
            feed,
        );
        (container, producer)
    }

    #[tokio::test]
    async fn test_step_advances_chain() {
        let (container, mut producer) = producer().await;

        let block = producer.step(1_000).await.unwrap();
        assert_eq!(block.header.height, 2);
        assert_eq!(block.header.timestamp, 1_001);
        assert_eq!(container.service.best_block_hash(), block.hash());
        assert_eq!(block.body.shard_states.len(), 2);
    }

    #[tokio::test]
    async fn test_full_epoch_assigns_stakers() {
        let (container, mut producer) = producer().await;

        for i in 0..10 {
            producer.step(2_000 + i * 10).await.unwrap();
        }
        let state = container.service.best_state();
        assert_eq!(state.beacon_height, 11);
        assert_eq!(state.epoch, 2);
        assert!(state.is_get_random_number || state.current_random_number != 0);

        let staked = state
            .shard_pending_validator
            .values()
            .flatten()
            .chain(&state.beacon_pending_validator)
            .chain(&state.beacon_committee)
            .chain(&state.candidate_shard_waiting_for_next_random)
            .chain(&state.candidate_beacon_waiting_for_next_random)
            .filter(|key| key.as_str().starts_with("devnet-staker-"))
            .count();
        assert_eq!(staked, 3);
        assert_eq!(container.storage.block_count(), 11);
    }
}
