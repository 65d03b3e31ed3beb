//! # Pipeline Integration
//!
//! A producing node and a following node built from the same genesis:
//!
//! 1. **Determinism**: the follower, validating with full vote checks,
//!    reaches a best state identical to the producer's after every block
//! 2. **Root integrity**: a single flipped root byte is rejected after the
//!    transition, with no visible mutation
//! 3. **Concurrency**: parallel sign-only checks and parallel inserts of
//!    one block commit it exactly once

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use qc_18_beacon_chain::domain::{RootKind, StakeChain};
    use qc_18_beacon_chain::{BeaconChainApi, BeaconError, BeaconParams, ErrorKind};

    fn feed_pool(node: &TestNode, height: u64, instructions: Vec<Vec<String>>) {
        node.pool.add_block(summary(0, height, instructions));
        node.pool.add_block(summary(1, height, Vec::new()));
    }

    #[tokio::test]
    async fn test_follower_reaches_identical_state() {
        let producer = TestNode::new(BeaconParams::for_testing()).await;
        let follower = TestNode::new(BeaconParams::for_testing()).await;
        assert_eq!(
            producer.service.best_block_hash(),
            follower.service.best_block_hash(),
            "genesis must be deterministic"
        );

        for shard_height in 1..=12u64 {
            let instructions = match shard_height {
                2 => vec![stake(StakeChain::Shard, "late-shard")],
                3 => vec![stake(StakeChain::Beacon, "late-beacon")],
                _ => Vec::new(),
            };
            feed_pool(&producer, shard_height, instructions);

            let block = producer.produce_and_insert().await;
            follower
                .service
                .insert_block(block.clone(), false)
                .await
                .unwrap();

            assert_eq!(follower.service.best_block_hash(), block.hash());
            assert_eq!(*follower.service.best_state(), *producer.service.best_state());
        }
        assert_eq!(follower.storage.block_count(), 13);
    }

    #[tokio::test]
    async fn test_flipped_root_rejected_without_mutation() {
        let producer = TestNode::new(BeaconParams::for_testing()).await;
        let follower = TestNode::new(BeaconParams::for_testing()).await;
        feed_pool(&producer, 1, vec![stake(StakeChain::Shard, "new-key")]);

        let mut block = producer.produce().await.unwrap();
        block.header.shard_candidate_root[0] ^= 0x01;

        let before = follower.service.best_state();
        let err = follower.service.insert_block(block, false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PostVerification);
        assert!(matches!(
            err,
            BeaconError::RootMismatch {
                root: RootKind::ShardCandidate,
                ..
            }
        ));
        assert_eq!(*follower.service.best_state(), *before);
        assert_eq!(follower.storage.block_count(), 1);
    }

    #[tokio::test]
    async fn test_parallel_sign_checks_do_not_mutate() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        feed_pool(&node, 1, vec![stake(StakeChain::Beacon, "signer-check")]);
        let block = node.produce().await.unwrap();

        let (first, second) = tokio::join!(
            node.service.verify_for_signing(&block),
            node.service.verify_for_signing(&block)
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(node.service.best_state().beacon_height, 1);

        node.service.insert_block(block, true).await.unwrap();
        assert_eq!(node.service.best_state().beacon_height, 2);
    }

    #[tokio::test]
    async fn test_parallel_inserts_commit_once() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        let block = node.produce().await.unwrap();

        let (first, second) = tokio::join!(
            node.service.insert_block(block.clone(), false),
            node.service.insert_block(block.clone(), false)
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(node.storage.block_count(), 2);
        assert_eq!(node.service.best_block_hash(), block.hash());
    }

    #[tokio::test]
    async fn test_competing_round_is_context_error() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        let state = node.service.best_state();
        let timestamp = state.best_block_timestamp + BLOCK_SPACING;
        node.oracle.set_timestamp(timestamp);

        let round_two = state.producer_for_round(2).cloned().unwrap();
        let mut late = node.service.new_block(&round_two, 2, timestamp).await.unwrap();
        sign(&mut late, state.beacon_committee.len());

        node.produce_and_insert().await;
        let err = node.service.insert_block(late, false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Context);
        assert!(err.kind().is_retryable());
        assert_eq!(node.service.best_state().beacon_height, 2);
    }
}
