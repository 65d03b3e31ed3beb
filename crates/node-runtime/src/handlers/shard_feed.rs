//! Synthetic shard traffic for a devnet with no shard chains attached.
//!
//! Each tick adds one summary per active shard to the pool. Every
//! `stake_every` beacon heights shard 0 also carries a stake for a fresh
//! key, alternating between shard and beacon candidates, so the epoch cycle
//! has something to assign.

use qc_18_beacon_chain::domain::{StakeChain, StakeEntry};
use qc_18_beacon_chain::{BeaconParams, InMemoryShardPool, Instruction, ShardToBeaconBlock};
use shared_types::{hash_strings, CommitteeKey, ShardId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct ShardFeed {
    pool: Arc<InMemoryShardPool>,
    next_height: BTreeMap<ShardId, u64>,
    stake_every: u64,
    stakers: u64,
}

impl ShardFeed {
    pub fn new(pool: Arc<InMemoryShardPool>, params: &BeaconParams, stake_every: u64) -> Self {
        Self {
            pool,
            next_height: params.shard_ids().map(|id| (id, 1)).collect(),
            stake_every,
            stakers: 0,
        }
    }

    /// Add the summaries for beacon height `beacon_height`.
    pub fn tick(&mut self, beacon_height: u64, timestamp: i64) -> usize {
        let stake = self.stake_every > 0 && beacon_height % self.stake_every == 0;
        let mut staked = None;
        let shards: Vec<ShardId> = self.next_height.keys().copied().collect();

        for shard_id in &shards {
            let instructions = if stake && *shard_id == 0 {
                let (key, fields) = self.next_stake();
                staked = Some(key);
                vec![fields]
            } else {
                Vec::new()
            };
            let height = self.next_height.get(shard_id).copied().unwrap_or(1);
            self.pool
                .add_block(summary(*shard_id, height, timestamp, instructions));
            self.next_height.insert(*shard_id, height + 1);
        }

        debug!(beacon_height, shards = shards.len(), staked = ?staked, "Fed shard summaries");
        shards.len()
    }

    fn next_stake(&mut self) -> (CommitteeKey, Vec<String>) {
        let index = self.stakers;
        self.stakers += 1;
        let key = CommitteeKey::new(format!("devnet-staker-{index}"));
        let chain = if index % 2 == 0 {
            StakeChain::Shard
        } else {
            StakeChain::Beacon
        };
        let fields = Instruction::Stake {
            chain,
            entries: vec![StakeEntry {
                key: key.clone(),
                tx_id: Some(format!("devnet-tx-{index}")),
                reward_receiver: Some(key.as_str().to_string()),
                auto_stake: true,
            }],
        }
        .to_fields();
        (key, fields)
    }
}

fn summary(
    shard_id: ShardId,
    height: u64,
    timestamp: i64,
    instructions: Vec<Vec<String>>,
) -> ShardToBeaconBlock {
    ShardToBeaconBlock {
        shard_id,
        height,
        hash: hash_strings(&[shard_id.to_string(), height.to_string()]),
        cross_shard: Vec::new(),
        propose_time: timestamp,
        instructions,
        validators_idx: vec![0],
        agg_sig: vec![1],
        r: Vec::new(),
    }
}
