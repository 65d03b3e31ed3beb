//! # Epoch Cycle Integration
//!
//! Two full epochs on the small test network (epoch 10, random time 5,
//! two shards), with stakes arriving from shard summaries:
//!
//! ```text
//! h2  stakes land in the next-random pools
//! h5  random time: snapshot into the current-random pools
//! h6  random instruction: shard round-robin, beacon shuffle into pending
//! h10 end-of-epoch swap fills the beacon committee from pending
//! h11 epoch 2
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use qc_18_beacon_chain::domain::StakeChain;
    use qc_18_beacon_chain::{BeaconChainApi, BeaconParams, FixedRandomOracle};
    use shared_types::CommitteeKey;

    #[tokio::test]
    async fn test_two_epochs_keep_protocol_properties() {
        let params = BeaconParams::for_testing();
        let node = TestNode::new(params.clone()).await;

        for shard_height in 1..=20u64 {
            let (zero, one) = if shard_height == 1 {
                (
                    vec![
                        stake(StakeChain::Beacon, "beacon-staker"),
                        stake(StakeChain::Shard, "shard-staker-a"),
                    ],
                    vec![stake(StakeChain::Shard, "shard-staker-b")],
                )
            } else {
                (Vec::new(), Vec::new())
            };
            node.pool.add_block(summary(0, shard_height, zero));
            node.pool.add_block(summary(1, shard_height, one));

            let before = node.service.best_state();
            node.produce_and_insert().await;
            let after = node.service.best_state();

            assert_eq!(after.beacon_height, before.beacon_height + 1);
            let expected_epoch = if after.beacon_height % params.epoch_length == 1 {
                before.epoch + 1
            } else {
                before.epoch
            };
            assert_eq!(after.epoch, expected_epoch, "height {}", after.beacon_height);

            assert!(!has_duplicates(&beacon_role(&after)), "height {}", after.beacon_height);
            assert!(!has_duplicates(&shard_role(&after)), "height {}", after.beacon_height);

            let size = after.beacon_committee.len();
            assert!(size >= params.min_beacon_committee_size);
            assert!(size <= params.max_beacon_committee_size);
            let entered = after
                .beacon_committee
                .iter()
                .filter(|k| !before.beacon_committee.contains(k))
                .count();
            assert!(entered <= params.swap_offset);
        }

        let state = node.service.best_state();
        assert_eq!(state.beacon_height, 21);
        assert_eq!(state.epoch, 3);

        let beacon_staker = CommitteeKey::from("beacon-staker");
        assert_eq!(state.beacon_committee.len(), 5);
        assert_eq!(state.beacon_committee.last(), Some(&beacon_staker));
        assert!(state.beacon_pending_validator.is_empty());

        let pending: Vec<&CommitteeKey> = state.shard_pending_validator.values().flatten().collect();
        assert_eq!(pending.len(), 2);
        assert!(pending.contains(&&CommitteeKey::from("shard-staker-a")));
        assert!(pending.contains(&&CommitteeKey::from("shard-staker-b")));
        assert_eq!(state.auto_staking.get(&beacon_staker), Some(&true));
    }

    #[tokio::test]
    async fn test_random_number_comes_from_snapshot_timestamp() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        for _ in 0..5 {
            node.produce_and_insert().await;
        }
        let state = node.service.best_state();
        assert_eq!(state.beacon_height, 6);
        assert!(state.is_get_random_number);

        // Random time is height 5, produced 4 spacings after genesis.
        let snapshot_ts = GENESIS_TIMESTAMP + 4 * BLOCK_SPACING;
        assert_eq!(state.current_random_timestamp, snapshot_ts);
        assert_eq!(
            state.current_random_number,
            FixedRandomOracle::nonce_for(snapshot_ts)
        );
    }

    #[tokio::test]
    async fn test_before_epoch_end_boundary_swaps_one_height_earlier() {
        let params = BeaconParams {
            swap_boundary: qc_18_beacon_chain::SwapBoundary::BeforeEpochEnd,
            ..BeaconParams::for_testing()
        };
        let node = TestNode::new(params).await;
        node.pool
            .add_block(summary(0, 1, vec![stake(StakeChain::Beacon, "early-swap")]));

        // Heights 2..=9.
        for _ in 0..8 {
            node.produce_and_insert().await;
        }
        let state = node.service.best_state();
        assert_eq!(state.beacon_height, 9);
        assert!(state.beacon_committee.contains(&CommitteeKey::from("early-swap")));
    }
}
