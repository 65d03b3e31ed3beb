//! Genesis block construction.

use super::hashing::{instruction_hash, instruction_merkle_root, shard_state_hash};
use super::instruction::{Instruction, StakeChain, StakeEntry};
use super::{
    BeaconBestState, BeaconBlock, BeaconBlockBody, BeaconBlockHeader, BeaconError, BeaconParams,
    BeaconResult, CommitteeVotes,
};
use shared_types::{CommitteeKey, ZERO_HASH};
use std::collections::BTreeSet;

/// Builds height 1 from the initial key sets.
///
/// The genesis block stakes every key; applying it to an empty state seats
/// beacon keys in the beacon committee and spreads shard keys over the
/// active shards.
#[derive(Debug, Clone)]
pub struct GenesisBuilder {
    params: BeaconParams,
    beacon_keys: Vec<CommitteeKey>,
    shard_keys: Vec<CommitteeKey>,
    timestamp: i64,
    auto_stake: bool,
}

impl GenesisBuilder {
    pub fn new(params: BeaconParams) -> Self {
        Self {
            params,
            beacon_keys: Vec::new(),
            shard_keys: Vec::new(),
            timestamp: 0,
            auto_stake: true,
        }
    }

    pub fn beacon_keys<K: Into<CommitteeKey>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.beacon_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn shard_keys<K: Into<CommitteeKey>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.shard_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn auto_stake(mut self, auto_stake: bool) -> Self {
        self.auto_stake = auto_stake;
        self
    }

    pub fn build(self) -> BeaconResult<(BeaconBlock, BeaconBestState)> {
        self.params
            .validate()
            .map_err(|e| BeaconError::Transition(format!("invalid parameters: {e}")))?;

        let beacon_size = self.beacon_keys.len();
        if beacon_size < self.params.min_beacon_committee_size
            || beacon_size > self.params.max_beacon_committee_size
        {
            return Err(BeaconError::CommitteeSizeOutOfBounds {
                role: "beacon".into(),
                size: beacon_size,
                min: self.params.min_beacon_committee_size,
                max: self.params.max_beacon_committee_size,
            });
        }
        let shard_seats = usize::from(self.params.active_shards) * self.params.min_shard_committee_size;
        if self.shard_keys.len() < shard_seats {
            return Err(BeaconError::CommitteeSizeOutOfBounds {
                role: "shard".into(),
                size: self.shard_keys.len(),
                min: shard_seats,
                max: usize::MAX,
            });
        }

        let mut seen = BTreeSet::new();
        for key in self.beacon_keys.iter().chain(&self.shard_keys) {
            if !key.is_well_formed() {
                return Err(BeaconError::MalformedProducer(key.as_str().to_string()));
            }
            if !seen.insert(key) {
                return Err(BeaconError::DuplicateStaker(key.clone()));
            }
        }

        let producer = self
            .beacon_keys
            .first()
            .cloned()
            .ok_or_else(|| BeaconError::Transition("genesis needs a beacon producer".into()))?;

        let instructions = vec![
            self.stake(StakeChain::Beacon, &self.beacon_keys),
            self.stake(StakeChain::Shard, &self.shard_keys),
        ];
        let body = BeaconBlockBody {
            shard_states: Default::default(),
            instructions,
        };
        let mut header = BeaconBlockHeader {
            producer,
            version: self.params.block_version,
            height: 1,
            epoch: 1,
            round: 1,
            timestamp: self.timestamp,
            propose_time: self.timestamp,
            previous_block_hash: ZERO_HASH,
            instruction_hash: instruction_hash(&body.instructions),
            shard_state_hash: shard_state_hash(&body.shard_states),
            instruction_merkle_root: instruction_merkle_root(&body.instructions),
            beacon_committee_and_validator_root: ZERO_HASH,
            beacon_candidate_root: ZERO_HASH,
            shard_candidate_root: ZERO_HASH,
            shard_committee_and_validator_root: ZERO_HASH,
            auto_staking_root: ZERO_HASH,
        };

        let empty = BeaconBestState::new(self.params);
        let mut block = BeaconBlock {
            header: header.clone(),
            body,
            producer_signature: Vec::new(),
            votes: CommitteeVotes::default(),
        };

        // Roots are part of the hash, so apply once to derive them and again
        // to record the final hash.
        let mut probe = empty.clone();
        probe.apply_block(&block)?;
        header.set_state_roots(&probe.roots());
        block.header = header;

        let mut state = empty;
        state.apply_block(&block)?;
        Ok((block, state))
    }

    fn stake(&self, chain: StakeChain, keys: &[CommitteeKey]) -> Vec<String> {
        Instruction::Stake {
            chain,
            entries: keys
                .iter()
                .map(|key| StakeEntry {
                    key: key.clone(),
                    tx_id: None,
                    reward_receiver: None,
                    auto_stake: self.auto_stake,
                })
                .collect(),
        }
        .to_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> GenesisBuilder {
        GenesisBuilder::new(BeaconParams::for_testing())
            .beacon_keys(["b0", "b1", "b2", "b3"])
            .shard_keys(["s0", "s1", "s2", "s3", "s4"])
            .timestamp(1_000)
    }

    #[test]
    fn test_genesis_layout() {
        let (block, state) = builder().build().unwrap();
        assert_eq!(block.height(), 1);
        assert_eq!(state.best_block_hash, block.hash());
        assert_eq!(state.roots(), block.header.state_roots());
        assert_eq!(state.beacon_committee.len(), 4);
        assert_eq!(state.shard_committee_of(0), &[CommitteeKey::from("s0"), CommitteeKey::from("s1")]);
        assert_eq!(state.shard_committee_of(1), &[CommitteeKey::from("s2"), CommitteeKey::from("s3")]);
        assert_eq!(state.candidate_shard_waiting_for_next_random, vec![CommitteeKey::from("s4")]);
        assert_eq!(state.auto_staking.len(), 9);
        assert_eq!(state.best_block_timestamp, 1_000);
    }

    #[test]
    fn test_genesis_is_reproducible() {
        let (a, _) = builder().build().unwrap();
        let (b, _) = builder().build().unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_genesis_rejects_duplicates() {
        let result = builder().shard_keys(["b0", "s1", "s2", "s3"]).build();
        assert!(matches!(result, Err(BeaconError::DuplicateStaker(_))));
    }

    #[test]
    fn test_genesis_requires_enough_keys() {
        let result = builder().beacon_keys(["b0"]).build();
        assert!(matches!(result, Err(BeaconError::CommitteeSizeOutOfBounds { .. })));
        let result = builder().shard_keys(["s0"]).build();
        assert!(matches!(result, Err(BeaconError::CommitteeSizeOutOfBounds { .. })));
    }

    #[test]
    fn test_zero_minimum_committee_is_an_error() {
        let params = BeaconParams {
            min_beacon_committee_size: 0,
            ..BeaconParams::for_testing()
        };
        let result = GenesisBuilder::new(params)
            .beacon_keys(Vec::<CommitteeKey>::new())
            .shard_keys(["s0", "s1", "s2", "s3"])
            .build();
        assert!(matches!(result, Err(BeaconError::Transition(_))));
    }
}
