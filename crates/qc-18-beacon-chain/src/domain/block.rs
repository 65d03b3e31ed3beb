//! Beacon block entities.

use super::{BeaconError, BeaconResult, StateRoots};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use shared_types::{BeaconBlockSummary, CommitteeKey, Hash, ShardId, ShardStateRecord};
use std::collections::BTreeMap;

/// Beacon block header.
///
/// Every field except the signatures (which live on [`BeaconBlock`]) feeds
/// the header hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    pub producer: CommitteeKey,
    pub version: u32,
    pub height: u64,
    pub epoch: u64,
    /// Tie-break among producers within a height; starts at 1.
    pub round: u32,
    pub timestamp: i64,
    pub propose_time: i64,
    pub previous_block_hash: Hash,
    pub instruction_hash: Hash,
    pub shard_state_hash: Hash,
    pub instruction_merkle_root: Hash,
    pub beacon_committee_and_validator_root: Hash,
    pub beacon_candidate_root: Hash,
    pub shard_candidate_root: Hash,
    pub shard_committee_and_validator_root: Hash,
    pub auto_staking_root: Hash,
}

impl BeaconBlockHeader {
    /// Keccak-256 over the fixed-order little-endian encoding.
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        let producer = self.producer.as_str().as_bytes();
        hasher.update((producer.len() as u64).to_le_bytes());
        hasher.update(producer);
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.epoch.to_le_bytes());
        hasher.update(self.round.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.propose_time.to_le_bytes());
        hasher.update(self.previous_block_hash);
        hasher.update(self.instruction_hash);
        hasher.update(self.shard_state_hash);
        hasher.update(self.instruction_merkle_root);
        hasher.update(self.beacon_committee_and_validator_root);
        hasher.update(self.beacon_candidate_root);
        hasher.update(self.shard_candidate_root);
        hasher.update(self.shard_committee_and_validator_root);
        hasher.update(self.auto_staking_root);
        hasher.finalize().into()
    }

    pub fn state_roots(&self) -> StateRoots {
        StateRoots {
            beacon_committee_and_validator: self.beacon_committee_and_validator_root,
            beacon_candidate: self.beacon_candidate_root,
            shard_candidate: self.shard_candidate_root,
            shard_committee_and_validator: self.shard_committee_and_validator_root,
            auto_staking: self.auto_staking_root,
        }
    }

    pub fn set_state_roots(&mut self, roots: &StateRoots) {
        self.beacon_committee_and_validator_root = roots.beacon_committee_and_validator;
        self.beacon_candidate_root = roots.beacon_candidate;
        self.shard_candidate_root = roots.shard_candidate;
        self.shard_committee_and_validator_root = roots.shard_committee_and_validator;
        self.auto_staking_root = roots.auto_staking;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockBody {
    /// Shard blocks folded into this block, per shard in height order.
    pub shard_states: BTreeMap<ShardId, Vec<ShardStateRecord>>,
    /// Raw wire instructions, in application order.
    pub instructions: Vec<Vec<String>>,
}

/// Committee votes over the header hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeVotes {
    /// Positions in the beacon committee that signed.
    pub validators_idx: Vec<usize>,
    pub agg_sig: Vec<u8>,
    pub r: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlock {
    pub header: BeaconBlockHeader,
    pub body: BeaconBlockBody,
    pub producer_signature: Vec<u8>,
    pub votes: CommitteeVotes,
}

impl BeaconBlock {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Highest shard height carried, per shard.
    pub fn shard_tips(&self) -> BTreeMap<ShardId, u64> {
        self.body
            .shard_states
            .iter()
            .filter_map(|(shard, records)| records.last().map(|r| (*shard, r.height)))
            .collect()
    }

    pub fn summary(&self) -> BeaconBlockSummary {
        BeaconBlockSummary {
            hash: self.hash(),
            height: self.header.height,
            epoch: self.header.epoch,
            round: self.header.round,
            producer: self.header.producer.clone(),
            timestamp: self.header.timestamp,
            instruction_count: self.body.instructions.len(),
            shard_heights: self.shard_tips(),
        }
    }

    /// Storage encoding.
    pub fn encode(&self) -> BeaconResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| BeaconError::Storage(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> BeaconResult<Self> {
        bincode::deserialize(bytes).map_err(|e| BeaconError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BeaconBlockHeader {
        BeaconBlockHeader {
            producer: CommitteeKey::from("producer-1"),
            version: 1,
            height: 2,
            epoch: 1,
            round: 1,
            timestamp: 1_000,
            propose_time: 1_000,
            previous_block_hash: [1u8; 32],
            instruction_hash: [0u8; 32],
            shard_state_hash: [0u8; 32],
            instruction_merkle_root: [0u8; 32],
            beacon_committee_and_validator_root: [0u8; 32],
            beacon_candidate_root: [0u8; 32],
            shard_candidate_root: [0u8; 32],
            shard_committee_and_validator_root: [0u8; 32],
            auto_staking_root: [0u8; 32],
        }
    }

    #[test]
    fn test_header_hash_covers_roots() {
        let header = sample_header();
        let mut changed = header.clone();
        changed.auto_staking_root = [9u8; 32];
        assert_ne!(header.hash(), changed.hash());
    }

    #[test]
    fn test_header_hash_is_deterministic() {
        assert_eq!(sample_header().hash(), sample_header().hash());
    }

    #[test]
    fn test_signatures_do_not_affect_hash() {
        let block = BeaconBlock {
            header: sample_header(),
            body: BeaconBlockBody::default(),
            producer_signature: vec![],
            votes: CommitteeVotes::default(),
        };
        let mut signed = block.clone();
        signed.producer_signature = vec![1, 2, 3];
        signed.votes.validators_idx = vec![0, 1, 2];
        assert_eq!(block.hash(), signed.hash());
    }

    #[test]
    fn test_storage_encoding() {
        let mut block = BeaconBlock {
            header: sample_header(),
            body: BeaconBlockBody::default(),
            producer_signature: vec![7],
            votes: CommitteeVotes::default(),
        };
        block.body.shard_states.insert(
            1,
            vec![ShardStateRecord {
                height: 3,
                hash: [3u8; 32],
                cross_shard: vec![0],
                propose_time: 5,
            }],
        );
        let decoded = BeaconBlock::decode(&block.encode().unwrap()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.shard_tips(), BTreeMap::from([(1, 3)]));
        assert!(BeaconBlock::decode(&[1, 2, 3]).is_err());
    }
}
