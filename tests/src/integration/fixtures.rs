//! # Integration Fixtures
//!
//! A beacon node wired exactly like the devnet runtime: in-memory adapters
//! and a real `InMemoryEventBus` behind `BusEventPublisher`.

use std::sync::Arc;

use qc_18_beacon_chain::domain::{StakeChain, StakeEntry};
use qc_18_beacon_chain::{
    AcceptAllVerifier, BeaconBestState, BeaconBlock, BeaconChainApi, BeaconChainDependencies,
    BeaconChainService, BeaconParams, BeaconResult, BusEventPublisher, FixedRandomOracle,
    GenesisBuilder, InMemoryBlockStorage, InMemoryShardPool, Instruction, ShardToBeaconBlock,
};
use shared_bus::InMemoryEventBus;
use shared_types::{hash_strings, CommitteeKey, ShardId};

pub const GENESIS_TIMESTAMP: i64 = 10_000;
pub const BLOCK_SPACING: i64 = 10;

pub type TestService = BeaconChainService<
    InMemoryShardPool,
    AcceptAllVerifier,
    FixedRandomOracle,
    InMemoryBlockStorage,
    BusEventPublisher<InMemoryEventBus>,
>;

pub struct TestNode {
    pub service: TestService,
    pub pool: Arc<InMemoryShardPool>,
    pub oracle: Arc<FixedRandomOracle>,
    pub storage: Arc<InMemoryBlockStorage>,
    pub bus: Arc<InMemoryEventBus>,
}

pub fn genesis(params: BeaconParams) -> (BeaconBlock, BeaconBestState) {
    let shard_keys = params.active_shards as usize * params.min_shard_committee_size;
    GenesisBuilder::new(params.clone())
        .beacon_keys((0..params.min_beacon_committee_size).map(|i| format!("beacon-{i}")))
        .shard_keys((0..shard_keys).map(|i| format!("shard-{i}")))
        .timestamp(GENESIS_TIMESTAMP)
        .build()
        .expect("genesis")
}

impl TestNode {
    pub async fn new(params: BeaconParams) -> Self {
        let (block, state) = genesis(params);
        let pool = Arc::new(InMemoryShardPool::new());
        let oracle = Arc::new(FixedRandomOracle::new(GENESIS_TIMESTAMP));
        let storage = Arc::new(InMemoryBlockStorage::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let deps = BeaconChainDependencies {
            shard_pool: Arc::clone(&pool),
            sig_verifier: Arc::new(AcceptAllVerifier),
            random_oracle: Arc::clone(&oracle),
            storage: Arc::clone(&storage),
            event_bus: Arc::new(BusEventPublisher::new(Arc::clone(&bus))),
        };
        let service = BeaconChainService::with_genesis(deps, block, state)
            .await
            .expect("service");
        Self {
            service,
            pool,
            oracle,
            storage,
            bus,
        }
    }

    /// Build and sign the next block as the round-1 proposer.
    pub async fn produce(&self) -> BeaconResult<BeaconBlock> {
        let state = self.service.best_state();
        let timestamp = state.best_block_timestamp + BLOCK_SPACING;
        self.oracle.set_timestamp(timestamp);
        let proposer = state.producer_for_round(1).cloned().expect("proposer");
        let mut block = self.service.new_block(&proposer, 1, timestamp).await?;
        sign(&mut block, state.beacon_committee.len());
        Ok(block)
    }

    pub async fn produce_and_insert(&self) -> BeaconBlock {
        let block = self.produce().await.expect("produce");
        self.service
            .insert_block(block.clone(), false)
            .await
            .expect("insert");
        block
    }
}

pub fn sign(block: &mut BeaconBlock, committee_size: usize) {
    block.producer_signature = block.header.producer.as_str().as_bytes().to_vec();
    block.votes.validators_idx = (0..committee_size / 2 + 1).collect();
    block.votes.agg_sig = vec![1];
}

pub fn summary(shard_id: ShardId, height: u64, instructions: Vec<Vec<String>>) -> ShardToBeaconBlock {
    ShardToBeaconBlock {
        shard_id,
        height,
        hash: hash_strings(&[format!("shard-{shard_id}"), height.to_string()]),
        cross_shard: vec![0b1],
        propose_time: GENESIS_TIMESTAMP + height as i64,
        instructions,
        validators_idx: vec![0],
        agg_sig: vec![1],
        r: Vec::new(),
    }
}

pub fn stake(chain: StakeChain, key: &str) -> Vec<String> {
    Instruction::Stake {
        chain,
        entries: vec![StakeEntry {
            key: CommitteeKey::from(key),
            tx_id: Some(format!("tx-{key}")),
            reward_receiver: Some(format!("receiver-{key}")),
            auto_stake: true,
        }],
    }
    .to_fields()
}

/// Every key of one role, with repeats.
pub fn beacon_role(state: &BeaconBestState) -> Vec<&CommitteeKey> {
    state
        .beacon_committee
        .iter()
        .chain(&state.beacon_pending_validator)
        .chain(&state.candidate_beacon_waiting_for_current_random)
        .chain(&state.candidate_beacon_waiting_for_next_random)
        .collect()
}

pub fn shard_role(state: &BeaconBestState) -> Vec<&CommitteeKey> {
    state
        .shard_committee
        .values()
        .flatten()
        .chain(state.shard_pending_validator.values().flatten())
        .chain(&state.candidate_shard_waiting_for_current_random)
        .chain(&state.candidate_shard_waiting_for_next_random)
        .collect()
}

pub fn has_duplicates(keys: &[&CommitteeKey]) -> bool {
    let unique: std::collections::BTreeSet<_> = keys.iter().collect();
    unique.len() != keys.len()
}
