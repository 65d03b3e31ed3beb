//! Beacon best state: committee, candidate and epoch bookkeeping.
//!
//! The canonical instance is only ever replaced by a clone that absorbed one
//! whole block through [`BeaconBestState::apply_block`]; a failed
//! application leaves the clone to be discarded.

use super::committee::CandidateBatch;
use super::hashing::{auto_staking_root, concat_root, shard_committee_root, StateRoots};
use super::instruction::{parse_all, Instruction};
use super::{BeaconBlock, BeaconError, BeaconParams, BeaconResult, EpochController};
use crate::metrics;
use serde::{Deserialize, Serialize};
use shared_types::{BestStateSummary, CommitteeKey, CommitteeSnapshot, Hash, ShardId, ZERO_HASH};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBestState {
    pub best_block_hash: Hash,
    pub previous_best_block_hash: Hash,
    pub best_block_timestamp: i64,
    pub beacon_height: u64,
    pub epoch: u64,
    /// Committee position of the producer of the best block.
    pub beacon_proposer_index: usize,

    pub beacon_committee: Vec<CommitteeKey>,
    pub beacon_pending_validator: Vec<CommitteeKey>,
    pub candidate_beacon_waiting_for_current_random: Vec<CommitteeKey>,
    pub candidate_beacon_waiting_for_next_random: Vec<CommitteeKey>,
    pub candidate_shard_waiting_for_current_random: Vec<CommitteeKey>,
    pub candidate_shard_waiting_for_next_random: Vec<CommitteeKey>,
    pub shard_committee: BTreeMap<ShardId, Vec<CommitteeKey>>,
    pub shard_pending_validator: BTreeMap<ShardId, Vec<CommitteeKey>>,

    pub auto_staking: BTreeMap<CommitteeKey, bool>,
    pub reward_receiver: BTreeMap<CommitteeKey, String>,

    pub best_shard_height: BTreeMap<ShardId, u64>,
    pub best_shard_hash: BTreeMap<ShardId, Hash>,

    pub current_random_number: i64,
    pub current_random_timestamp: i64,
    pub is_get_random_number: bool,

    /// Legacy `set`/`del` table.
    pub param_table: BTreeMap<String, String>,

    pub params: BeaconParams,
}

/// Which committees a block touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitteeChange {
    pub beacon_changed: bool,
    pub shards_changed: BTreeSet<ShardId>,
}

impl CommitteeChange {
    fn between(before: &CommitteeSnapshot, after: &CommitteeSnapshot) -> Self {
        let beacon_changed = before.beacon_committee != after.beacon_committee
            || before.beacon_pending != after.beacon_pending;
        let shards: BTreeSet<ShardId> = before
            .shard_committees
            .keys()
            .chain(after.shard_committees.keys())
            .chain(before.shard_pending.keys())
            .chain(after.shard_pending.keys())
            .copied()
            .collect();
        let shards_changed = shards
            .into_iter()
            .filter(|shard| {
                before.shard_committees.get(shard) != after.shard_committees.get(shard)
                    || before.shard_pending.get(shard) != after.shard_pending.get(shard)
            })
            .collect();
        Self {
            beacon_changed,
            shards_changed,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.beacon_changed && self.shards_changed.is_empty()
    }
}

impl BeaconBestState {
    /// Empty pre-genesis state; the genesis block is its first application.
    pub fn new(params: BeaconParams) -> Self {
        let shards: Vec<ShardId> = params.shard_ids().collect();
        Self {
            best_block_hash: ZERO_HASH,
            previous_best_block_hash: ZERO_HASH,
            best_block_timestamp: 0,
            beacon_height: 0,
            epoch: 0,
            beacon_proposer_index: 0,
            beacon_committee: Vec::new(),
            beacon_pending_validator: Vec::new(),
            candidate_beacon_waiting_for_current_random: Vec::new(),
            candidate_beacon_waiting_for_next_random: Vec::new(),
            candidate_shard_waiting_for_current_random: Vec::new(),
            candidate_shard_waiting_for_next_random: Vec::new(),
            shard_committee: shards.iter().map(|s| (*s, Vec::new())).collect(),
            shard_pending_validator: shards.iter().map(|s| (*s, Vec::new())).collect(),
            auto_staking: BTreeMap::new(),
            reward_receiver: BTreeMap::new(),
            best_shard_height: BTreeMap::new(),
            best_shard_hash: BTreeMap::new(),
            current_random_number: 0,
            current_random_timestamp: 0,
            is_get_random_number: false,
            param_table: BTreeMap::new(),
            params,
        }
    }

    pub fn epoch_controller(&self) -> EpochController {
        EpochController::new(&self.params)
    }

    /// Producer expected for the next block at `round`.
    pub fn producer_for_round(&self, round: u32) -> Option<&CommitteeKey> {
        if self.beacon_committee.is_empty() {
            return None;
        }
        let index = (self.beacon_proposer_index + round as usize) % self.beacon_committee.len();
        self.beacon_committee.get(index)
    }

    /// Epoch the next block must declare.
    pub fn next_epoch(&self) -> u64 {
        self.epoch_controller()
            .epoch_for(self.beacon_height + 1, self.epoch)
    }

    pub fn shard_committee_of(&self, shard_id: ShardId) -> &[CommitteeKey] {
        self.shard_committee
            .get(&shard_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn shard_pending_of(&self, shard_id: ShardId) -> &[CommitteeKey] {
        self.shard_pending_validator
            .get(&shard_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every key holding a beacon-role position.
    pub fn beacon_role_keys(&self) -> impl Iterator<Item = &CommitteeKey> {
        self.beacon_committee
            .iter()
            .chain(&self.beacon_pending_validator)
            .chain(&self.candidate_beacon_waiting_for_current_random)
            .chain(&self.candidate_beacon_waiting_for_next_random)
    }

    /// Every key holding a shard-role position.
    pub fn shard_role_keys(&self) -> impl Iterator<Item = &CommitteeKey> {
        self.shard_committee
            .values()
            .flatten()
            .chain(self.shard_pending_validator.values().flatten())
            .chain(&self.candidate_shard_waiting_for_current_random)
            .chain(&self.candidate_shard_waiting_for_next_random)
    }

    /// Whether `key` sits in any committee, pending list or candidate pool.
    pub fn contains_key(&self, key: &CommitteeKey) -> bool {
        self.beacon_role_keys().chain(self.shard_role_keys()).any(|k| k == key)
    }

    /// First key found in more than one position, if any.
    pub fn duplicate_member(&self) -> Option<CommitteeKey> {
        let mut seen = BTreeSet::new();
        self.beacon_role_keys()
            .chain(self.shard_role_keys())
            .find(|key| !seen.insert(*key))
            .cloned()
    }

    pub fn roots(&self) -> StateRoots {
        StateRoots {
            beacon_committee_and_validator: concat_root(&[
                self.beacon_committee.as_slice(),
                self.beacon_pending_validator.as_slice(),
            ]),
            beacon_candidate: concat_root(&[
                self.candidate_beacon_waiting_for_current_random.as_slice(),
                self.candidate_beacon_waiting_for_next_random.as_slice(),
            ]),
            shard_candidate: concat_root(&[
                self.candidate_shard_waiting_for_current_random.as_slice(),
                self.candidate_shard_waiting_for_next_random.as_slice(),
            ]),
            shard_committee_and_validator: shard_committee_root(
                &self.shard_pending_validator,
                &self.shard_committee,
            ),
            auto_staking: auto_staking_root(&self.auto_staking),
        }
    }

    pub fn committee_snapshot(&self) -> CommitteeSnapshot {
        CommitteeSnapshot {
            height: self.beacon_height,
            epoch: self.epoch,
            beacon_committee: self.beacon_committee.clone(),
            beacon_pending: self.beacon_pending_validator.clone(),
            shard_committees: self.shard_committee.clone(),
            shard_pending: self.shard_pending_validator.clone(),
        }
    }

    pub fn summary(&self) -> BestStateSummary {
        BestStateSummary {
            best_block_hash: self.best_block_hash,
            height: self.beacon_height,
            epoch: self.epoch,
            proposer_index: self.beacon_proposer_index,
            current_random_number: self.current_random_number,
            is_get_random_number: self.is_get_random_number,
            beacon_committee_size: self.beacon_committee.len(),
            beacon_pending_size: self.beacon_pending_validator.len(),
        }
    }

    pub fn encode(&self) -> BeaconResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| BeaconError::Storage(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> BeaconResult<Self> {
        bincode::deserialize(bytes).map_err(|e| BeaconError::Storage(e.to_string()))
    }

    /// Advance this state by one block.
    ///
    /// Malformed instructions are dropped and logged; every other failure
    /// aborts and leaves `self` partially updated, so callers apply to a
    /// clone.
    pub fn apply_block(&mut self, block: &BeaconBlock) -> BeaconResult<CommitteeChange> {
        let header = &block.header;
        let height = header.height;
        if height != self.beacon_height + 1 {
            return Err(BeaconError::HeightMismatch {
                expected: self.beacon_height + 1,
                actual: height,
            });
        }
        let before = self.committee_snapshot();
        let epochs = self.epoch_controller();

        // Resolved against the committee the producer was chosen from.
        self.beacon_proposer_index = if height == 1 {
            0
        } else {
            self.beacon_committee
                .iter()
                .position(|key| key == &header.producer)
                .ok_or_else(|| {
                    BeaconError::Transition(format!(
                        "producer {} is not in the beacon committee",
                        header.producer
                    ))
                })?
        };

        if height == 1 {
            self.epoch = 1;
        } else if epochs.is_epoch_start(height) {
            self.epoch += 1;
            self.is_get_random_number = false;
        }
        self.previous_best_block_hash = self.best_block_hash;
        self.best_block_hash = block.hash();
        self.best_block_timestamp = header.timestamp;
        self.beacon_height = height;

        for (shard_id, records) in &block.body.shard_states {
            if let Some(last) = records.last() {
                self.best_shard_height.insert(*shard_id, last.height);
                self.best_shard_hash.insert(*shard_id, last.hash);
            }
        }

        let mut batch = CandidateBatch::default();
        let parsed = parse_all(&block.body.instructions);
        for (position, (raw, instruction)) in block.body.instructions.iter().zip(parsed).enumerate() {
            match instruction {
                Ok(instruction) => self.apply_instruction(instruction, &epochs, &mut batch)?,
                Err(err) => {
                    warn!(height, position, fields = ?raw, error = %err, "Dropping malformed instruction");
                    metrics::record_instruction_dropped(err.kind_label());
                }
            }
        }

        self.admit_candidates(batch.beacon, batch.shard, height);
        if epochs.is_random_time(height) {
            self.snapshot_candidates(header.timestamp);
        }
        if batch.random_found {
            self.assign_candidates();
        }

        Ok(CommitteeChange::between(&before, &self.committee_snapshot()))
    }

    fn apply_instruction(
        &mut self,
        instruction: Instruction,
        epochs: &EpochController,
        batch: &mut CandidateBatch,
    ) -> BeaconResult<()> {
        match instruction {
            Instruction::Stake { chain, entries } => self.apply_stake(chain, entries, batch),
            Instruction::Swap {
                target,
                in_keys,
                out_keys,
            } => self.apply_swap(target, &in_keys, &out_keys, batch)?,
            Instruction::Random { nonce, .. } => {
                if epochs.accepts_random(self.beacon_height, self.is_get_random_number) {
                    self.current_random_number = nonce;
                    self.is_get_random_number = true;
                    batch.random_found = true;
                } else {
                    debug!(height = self.beacon_height, nonce, "Random number ignored");
                }
            }
            Instruction::Unstake { keys } => self.apply_unstake(&keys, batch),
            Instruction::StopAutoStake { keys } => self.apply_stop_auto_stake(&keys, batch),
            Instruction::Set { key, value } => {
                self.param_table.insert(key, value);
            }
            Instruction::Del { key, .. } => {
                self.param_table.remove(&key);
            }
            Instruction::ReturnStake { .. } | Instruction::Opaque(_) => {}
        }
        Ok(())
    }
}
