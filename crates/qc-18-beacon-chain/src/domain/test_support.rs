//! Block and state builders shared by unit tests.

use super::hashing::{instruction_hash, instruction_merkle_root, shard_state_hash};
use super::{
    BeaconBestState, BeaconBlock, BeaconBlockBody, BeaconBlockHeader, BeaconParams,
    CommitteeVotes, GenesisBuilder,
};
use shared_types::ZERO_HASH;

pub const GENESIS_TIMESTAMP: i64 = 1_000;
pub const BLOCK_SPACING: i64 = 10;

/// Four beacon keys and two keys on each of two shards.
pub fn genesis_state() -> BeaconBestState {
    genesis().1
}

pub fn genesis() -> (BeaconBlock, BeaconBestState) {
    GenesisBuilder::new(BeaconParams::for_testing())
        .beacon_keys((0..4).map(|i| format!("beacon-{i}")))
        .shard_keys((0..4).map(|i| format!("shard-{i}")))
        .timestamp(GENESIS_TIMESTAMP)
        .build()
        .expect("test genesis")
}

/// Round-1 successor of `state` carrying `instructions`.
///
/// State roots are filled in when the instructions apply cleanly.
pub fn next_block(state: &BeaconBestState, instructions: Vec<Vec<String>>) -> BeaconBlock {
    let body = BeaconBlockBody {
        shard_states: Default::default(),
        instructions,
    };
    let header = BeaconBlockHeader {
        producer: state.producer_for_round(1).cloned().expect("non-empty committee"),
        version: state.params.block_version,
        height: state.beacon_height + 1,
        epoch: state.next_epoch(),
        round: 1,
        timestamp: state.best_block_timestamp + BLOCK_SPACING,
        propose_time: state.best_block_timestamp + BLOCK_SPACING,
        previous_block_hash: state.best_block_hash,
        instruction_hash: instruction_hash(&body.instructions),
        shard_state_hash: shard_state_hash(&body.shard_states),
        instruction_merkle_root: instruction_merkle_root(&body.instructions),
        beacon_committee_and_validator_root: ZERO_HASH,
        beacon_candidate_root: ZERO_HASH,
        shard_candidate_root: ZERO_HASH,
        shard_committee_and_validator_root: ZERO_HASH,
        auto_staking_root: ZERO_HASH,
    };
    let mut block = BeaconBlock {
        header,
        body,
        producer_signature: Vec::new(),
        votes: CommitteeVotes::default(),
    };
    let mut probe = state.clone();
    if probe.apply_block(&block).is_ok() {
        block.header.set_state_roots(&probe.roots());
    }
    block
}

/// Apply empty blocks until `height`.
pub fn advance_to(mut state: BeaconBestState, height: u64) -> BeaconBestState {
    while state.beacon_height < height {
        let block = next_block(&state, Vec::new());
        state.apply_block(&block).expect("empty block applies");
    }
    state
}

pub fn stake_fields(keys: &[&str], chain: &str, auto_stake: bool) -> Vec<String> {
    vec![
        "stake".into(),
        keys.join(","),
        chain.into(),
        String::new(),
        String::new(),
        vec![auto_stake.to_string(); keys.len()].join(","),
    ]
}

pub fn swap_fields(in_keys: &[&str], out_keys: &[&str], shard: Option<u8>) -> Vec<String> {
    let mut fields = vec!["swap".into(), in_keys.join(","), out_keys.join(",")];
    match shard {
        Some(id) => {
            fields.push("shard".into());
            fields.push(id.to_string());
        }
        None => fields.push("beacon".into()),
    }
    fields
}

pub fn random_fields(nonce: i64, timestamp: i64) -> Vec<String> {
    vec![
        "random".into(),
        nonce.to_string(),
        "0".into(),
        timestamp.to_string(),
        timestamp.to_string(),
    ]
}
