//! In-memory shard-to-beacon pool.

use crate::domain::ShardToBeaconBlock;
use crate::ports::ShardToBeaconPool;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::ShardId;
use std::collections::BTreeMap;
use tracing::debug;

/// Summaries per shard, ordered by height.
#[derive(Default)]
pub struct InMemoryShardPool {
    blocks: RwLock<BTreeMap<ShardId, BTreeMap<u64, ShardToBeaconBlock>>>,
}

impl InMemoryShardPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a summary; a later summary at the same height replaces the earlier.
    pub fn add_block(&self, block: ShardToBeaconBlock) {
        self.blocks
            .write()
            .entry(block.shard_id)
            .or_default()
            .insert(block.height, block);
    }

    pub fn len(&self) -> usize {
        self.blocks.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn heights(&self, shard_id: ShardId) -> Vec<u64> {
        self.blocks
            .read()
            .get(&shard_id)
            .map(|blocks| blocks.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ShardToBeaconPool for InMemoryShardPool {
    async fn get_valid_blocks(
        &self,
        best_heights: &BTreeMap<ShardId, u64>,
    ) -> BTreeMap<ShardId, Vec<ShardToBeaconBlock>> {
        self.blocks
            .read()
            .iter()
            .filter_map(|(shard_id, blocks)| {
                let best = best_heights.get(shard_id).copied().unwrap_or(0);
                let above: Vec<ShardToBeaconBlock> =
                    blocks.range(best + 1..).map(|(_, b)| b.clone()).collect();
                (!above.is_empty()).then_some((*shard_id, above))
            })
            .collect()
    }

    async fn remove_consumed(&self, heights: BTreeMap<ShardId, u64>) {
        let mut blocks = self.blocks.write();
        for (shard_id, height) in heights {
            if let Some(shard_blocks) = blocks.get_mut(&shard_id) {
                let kept = shard_blocks.split_off(&(height + 1));
                let removed = shard_blocks.len();
                *shard_blocks = kept;
                debug!(shard_id, height, removed, "Removed consumed shard blocks");
            }
        }
    }
}
