//! # Notification Integration
//!
//! Post-commit side effects observed through the shared bus:
//!
//! 1. **Commit order**: `NewBeaconBlock`, `NewBestState`, then the optional
//!    `ShardBlocksConsumed` and `CommitteeChanged`
//! 2. **Pool cleanup**: consumed shard summaries leave the pool
//! 3. **Rejections**: a failed insert publishes `BlockRejected` and nothing else

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::integration::fixtures::*;
    use qc_18_beacon_chain::domain::StakeChain;
    use qc_18_beacon_chain::{BeaconChainApi, BeaconParams};
    use shared_bus::{BeaconEvent, EventFilter, EventTopic, Subscription};

    async fn next_event(sub: &mut Subscription) -> BeaconEvent {
        timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timeout waiting for event")
            .expect("bus closed")
    }

    #[tokio::test]
    async fn test_commit_events_arrive_in_order() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        let mut sub = node.bus.subscribe(EventFilter::all());

        node.pool
            .add_block(summary(0, 1, vec![stake(StakeChain::Shard, "observed")]));
        let block = node.produce_and_insert().await;

        match next_event(&mut sub).await {
            BeaconEvent::NewBeaconBlock(summary) => {
                assert_eq!(summary.hash, block.hash());
                assert_eq!(summary.height, 2);
                assert_eq!(summary.shard_heights.get(&0), Some(&1));
            }
            other => panic!("Expected NewBeaconBlock, got {:?}", other),
        }
        match next_event(&mut sub).await {
            BeaconEvent::NewBestState(best) => {
                assert_eq!(best.best_block_hash, block.hash());
                assert_eq!(best.height, 2);
            }
            other => panic!("Expected NewBestState, got {:?}", other),
        }
        match next_event(&mut sub).await {
            BeaconEvent::ShardBlocksConsumed {
                beacon_height,
                heights,
            } => {
                assert_eq!(beacon_height, 2);
                assert_eq!(heights.get(&0), Some(&1));
            }
            other => panic!("Expected ShardBlocksConsumed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_committee_change_published_on_assignment() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        let mut sub = node
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Committee]));

        node.pool
            .add_block(summary(1, 1, vec![stake(StakeChain::Shard, "assigned")]));
        // Heights 2..=6; the random instruction lands at 6.
        for _ in 0..5 {
            node.produce_and_insert().await;
        }

        match next_event(&mut sub).await {
            BeaconEvent::CommitteeChanged(snapshot) => {
                assert_eq!(snapshot.height, 6);
                let pending: usize = snapshot.shard_pending.values().map(Vec::len).sum();
                assert_eq!(pending, 1);
            }
            other => panic!("Expected CommitteeChanged, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_consumed_summaries_leave_the_pool() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        for height in 1..=3 {
            node.pool.add_block(summary(0, height, Vec::new()));
        }
        node.pool.add_block(summary(1, 1, Vec::new()));

        node.produce_and_insert().await;

        timeout(Duration::from_secs(1), async {
            while !node.pool.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("pool never drained");
        assert_eq!(node.service.best_state().best_shard_height.get(&0), Some(&3));
    }

    #[tokio::test]
    async fn test_rejection_is_published() {
        let node = TestNode::new(BeaconParams::for_testing()).await;
        let mut sub = node.bus.subscribe(EventFilter::all());

        let mut block = node.produce().await.unwrap();
        block.body.instructions.push(vec!["set".into(), "k".into(), "v".into()]);
        let err = node.service.insert_block(block.clone(), false).await.unwrap_err();

        match next_event(&mut sub).await {
            BeaconEvent::BlockRejected {
                hash, height, kind, ..
            } => {
                assert_eq!(hash, block.hash());
                assert_eq!(height, 2);
                assert_eq!(kind, err.kind().as_str());
                assert_eq!(kind, "structural");
            }
            other => panic!("Expected BlockRejected, got {:?}", other),
        }
        assert!(sub.try_recv().unwrap().is_none());
        assert_eq!(node.service.best_state().beacon_height, 1);
    }
}
