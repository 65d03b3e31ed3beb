//! Committee rotation engine.
//!
//! Stake, swap, unstake and stop-auto-stake application, random-driven
//! candidate assignment and the bounded swap used at epoch boundaries.

use super::instruction::{Instruction, StakeChain, StakeEntry, SwapTarget};
use super::shuffle::shuffle_keys;
use super::{BeaconBestState, BeaconError, BeaconResult};
use shared_types::{CommitteeKey, ShardId};
use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use tracing::{debug, warn};

/// Candidates admitted while applying one block.
#[derive(Debug, Default)]
pub(crate) struct CandidateBatch {
    pub beacon: Vec<CommitteeKey>,
    pub shard: Vec<CommitteeKey>,
    pub random_found: bool,
}

impl CandidateBatch {
    fn contains(&self, key: &CommitteeKey) -> bool {
        self.beacon.contains(key) || self.shard.contains(key)
    }

    fn remove(&mut self, key: &CommitteeKey) -> bool {
        let before = self.beacon.len() + self.shard.len();
        self.beacon.retain(|k| k != key);
        self.shard.retain(|k| k != key);
        before != self.beacon.len() + self.shard.len()
    }
}

/// Result of one bounded rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub in_keys: Vec<CommitteeKey>,
    pub out_keys: Vec<CommitteeKey>,
    pub pending: Vec<CommitteeKey>,
    pub committee: Vec<CommitteeKey>,
}

impl SwapOutcome {
    pub fn is_noop(&self) -> bool {
        self.in_keys.is_empty() && self.out_keys.is_empty()
    }
}

/// Rotate at most `offset` keys from the front of `pending` into
/// `committee`.
///
/// A committee below `max_committee` is topped up without ejecting anyone.
/// A full committee exchanges its oldest members for the oldest pending
/// keys, so its size never changes.
pub fn swap_validator(
    pending: &[CommitteeKey],
    committee: &[CommitteeKey],
    max_committee: usize,
    offset: usize,
) -> SwapOutcome {
    let mut pending = pending.to_vec();
    let mut committee = committee.to_vec();

    if committee.len() < max_committee {
        let fill = (max_committee - committee.len()).min(pending.len()).min(offset);
        let in_keys: Vec<CommitteeKey> = pending.drain(..fill).collect();
        committee.extend(in_keys.iter().cloned());
        return SwapOutcome {
            in_keys,
            out_keys: Vec::new(),
            pending,
            committee,
        };
    }

    let count = offset.min(pending.len()).min(committee.len());
    let out_keys: Vec<CommitteeKey> = committee.drain(..count).collect();
    let in_keys: Vec<CommitteeKey> = pending.drain(..count).collect();
    committee.extend(in_keys.iter().cloned());
    SwapOutcome {
        in_keys,
        out_keys,
        pending,
        committee,
    }
}

/// Move `in_keys` from `pending` to the end of `committee` and drop
/// `out_keys` from `committee`.
fn rotate(
    pending: &mut Vec<CommitteeKey>,
    committee: &mut Vec<CommitteeKey>,
    in_keys: &[CommitteeKey],
    out_keys: &[CommitteeKey],
) -> BeaconResult<()> {
    for key in out_keys {
        let position = committee
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| BeaconError::SwapMismatch {
                key: key.clone(),
                list: "committee",
            })?;
        committee.remove(position);
    }
    for key in in_keys {
        let position = pending
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| BeaconError::SwapMismatch {
                key: key.clone(),
                list: "pending",
            })?;
        pending.remove(position);
        committee.push(key.clone());
    }
    Ok(())
}

/// Distribute `candidates` round-robin over shard pending lists.
///
/// The walk starts at `random mod shard_count`; a shard accepts while its
/// pending list is shorter than `capacity`. Candidates that fit nowhere are
/// returned in order.
pub fn assign_shard_candidates(
    pending: &mut BTreeMap<ShardId, Vec<CommitteeKey>>,
    candidates: Vec<CommitteeKey>,
    random: i64,
    active_shards: u8,
    capacity: usize,
) -> Vec<CommitteeKey> {
    let shard_count = usize::from(active_shards);
    if shard_count == 0 {
        return candidates;
    }
    let mut cursor = random.rem_euclid(shard_count as i64) as usize;
    let mut leftovers = Vec::new();

    for candidate in candidates {
        let slot = (0..shard_count)
            .map(|step| (cursor + step) % shard_count)
            .find(|shard| {
                pending
                    .get(&(*shard as ShardId))
                    .map_or(0, Vec::len)
                    < capacity
            });
        match slot {
            Some(shard) => {
                pending.entry(shard as ShardId).or_default().push(candidate);
                cursor = (shard + 1) % shard_count;
            }
            None => leftovers.push(candidate),
        }
    }
    leftovers
}

/// Dry-run every swap in `instructions` against `state` without touching it.
pub fn check_swaps(state: &BeaconBestState, instructions: &[Instruction]) -> BeaconResult<()> {
    let mut beacon_pending = state.beacon_pending_validator.clone();
    let mut beacon_committee = state.beacon_committee.clone();
    let mut shard_pending = state.shard_pending_validator.clone();
    let mut shard_committee = state.shard_committee.clone();

    for instruction in instructions {
        let Instruction::Swap {
            target,
            in_keys,
            out_keys,
        } = instruction
        else {
            continue;
        };
        match target {
            SwapTarget::Beacon => rotate(
                &mut beacon_pending,
                &mut beacon_committee,
                in_keys,
                out_keys,
            )?,
            SwapTarget::Shard(shard_id) => rotate(
                shard_pending.entry(*shard_id).or_default(),
                shard_committee.entry(*shard_id).or_default(),
                in_keys,
                out_keys,
            )?,
        }
    }
    Ok(())
}

impl BeaconBestState {
    pub(crate) fn apply_stake(
        &mut self,
        chain: StakeChain,
        entries: Vec<StakeEntry>,
        batch: &mut CandidateBatch,
    ) {
        for entry in entries {
            if self.contains_key(&entry.key) || batch.contains(&entry.key) {
                warn!(key = %entry.key, "Dropping stake for a key that is already staked");
                continue;
            }
            if let Some(receiver) = entry.reward_receiver {
                self.reward_receiver.insert(entry.key.clone(), receiver);
            }
            self.auto_staking.insert(entry.key.clone(), entry.auto_stake);
            match chain {
                StakeChain::Beacon => batch.beacon.push(entry.key),
                StakeChain::Shard => batch.shard.push(entry.key),
            }
        }
    }

    pub(crate) fn apply_swap(
        &mut self,
        target: SwapTarget,
        in_keys: &[CommitteeKey],
        out_keys: &[CommitteeKey],
        batch: &mut CandidateBatch,
    ) -> BeaconResult<()> {
        let (min, max) = match target {
            SwapTarget::Beacon => (
                self.params.min_beacon_committee_size,
                self.params.max_beacon_committee_size,
            ),
            SwapTarget::Shard(_) => (
                self.params.min_shard_committee_size,
                self.params.max_shard_committee_size,
            ),
        };

        let size = match target {
            SwapTarget::Beacon => {
                rotate(
                    &mut self.beacon_pending_validator,
                    &mut self.beacon_committee,
                    in_keys,
                    out_keys,
                )?;
                self.beacon_committee.len()
            }
            SwapTarget::Shard(shard_id) => {
                if shard_id >= self.params.active_shards {
                    return Err(BeaconError::Transition(format!(
                        "swap targets inactive shard {shard_id}"
                    )));
                }
                let committee = self.shard_committee.entry(shard_id).or_default();
                rotate(
                    self.shard_pending_validator.entry(shard_id).or_default(),
                    committee,
                    in_keys,
                    out_keys,
                )?;
                committee.len()
            }
        };

        if size < min || size > max {
            return Err(BeaconError::CommitteeSizeOutOfBounds {
                role: target.to_string(),
                size,
                min,
                max,
            });
        }

        for key in out_keys {
            if self.auto_staking.get(key).copied().unwrap_or(false) {
                debug!(%key, %target, "Swapped-out key re-enters the candidate pool");
                match target {
                    SwapTarget::Beacon => batch.beacon.push(key.clone()),
                    SwapTarget::Shard(_) => batch.shard.push(key.clone()),
                }
            } else {
                self.reward_receiver.remove(key);
                self.auto_staking.remove(key);
            }
        }
        Ok(())
    }

    pub(crate) fn apply_unstake(&mut self, keys: &[CommitteeKey], batch: &mut CandidateBatch) {
        for key in keys {
            let in_next_pool = self.candidate_beacon_waiting_for_next_random.contains(key)
                || self.candidate_shard_waiting_for_next_random.contains(key);
            if in_next_pool || batch.contains(key) {
                self.candidate_beacon_waiting_for_next_random.retain(|k| k != key);
                self.candidate_shard_waiting_for_next_random.retain(|k| k != key);
                batch.remove(key);
                self.reward_receiver.remove(key);
                self.auto_staking.remove(key);
            } else if self.contains_key(key) {
                self.auto_staking.insert(key.clone(), false);
            } else {
                debug!(%key, "Unstake for inactive key ignored");
            }
        }
    }

    pub(crate) fn apply_stop_auto_stake(&mut self, keys: &[CommitteeKey], batch: &CandidateBatch) {
        for key in keys {
            if self.contains_key(key) || batch.contains(key) {
                if let Some(flag) = self.auto_staking.get_mut(key) {
                    *flag = false;
                }
            } else if self.auto_staking.remove(key).is_none() {
                debug!(%key, "Stop-auto-stake for unknown key ignored");
            }
        }
    }

    /// Place candidates admitted by a block.
    ///
    /// Genesis seats them directly: beacon keys join the committee and shard
    /// keys fill each shard in turn up to the minimum committee size.
    pub(crate) fn admit_candidates(
        &mut self,
        beacon: Vec<CommitteeKey>,
        shard: Vec<CommitteeKey>,
        height: u64,
    ) {
        if height != 1 {
            self.candidate_beacon_waiting_for_next_random.extend(beacon);
            self.candidate_shard_waiting_for_next_random.extend(shard);
            return;
        }

        self.beacon_committee.extend(beacon);
        let chunk = self.params.min_shard_committee_size.max(1);
        let mut remaining = shard.into_iter();
        for shard_id in self.params.shard_ids() {
            let seated: Vec<CommitteeKey> = remaining.by_ref().take(chunk).collect();
            self.shard_committee.entry(shard_id).or_default().extend(seated);
        }
        self.candidate_shard_waiting_for_next_random.extend(remaining);
    }

    /// Move next-random pools behind whatever is still waiting for the
    /// current random number.
    pub(crate) fn snapshot_candidates(&mut self, timestamp: i64) {
        let beacon = mem::take(&mut self.candidate_beacon_waiting_for_next_random);
        let shard = mem::take(&mut self.candidate_shard_waiting_for_next_random);
        self.candidate_beacon_waiting_for_current_random.extend(beacon);
        self.candidate_shard_waiting_for_current_random.extend(shard);
        self.current_random_timestamp = timestamp;
        debug!(
            height = self.beacon_height,
            beacon = self.candidate_beacon_waiting_for_current_random.len(),
            shard = self.candidate_shard_waiting_for_current_random.len(),
            "Candidates snapshotted for the current random"
        );
    }

    /// Consume the current random number.
    pub(crate) fn assign_candidates(&mut self) {
        let random = self.current_random_number;

        let shard_candidates = mem::take(&mut self.candidate_shard_waiting_for_current_random);
        let mut rolled = assign_shard_candidates(
            &mut self.shard_pending_validator,
            shard_candidates,
            random,
            self.params.active_shards,
            self.params.assign_offset,
        );
        if !rolled.is_empty() {
            debug!(count = rolled.len(), "Shard candidates roll over to the next random");
            rolled.append(&mut self.candidate_shard_waiting_for_next_random);
            self.candidate_shard_waiting_for_next_random = rolled;
        }

        let mut beacon_candidates =
            mem::take(&mut self.candidate_beacon_waiting_for_current_random);
        shuffle_keys(&mut beacon_candidates, random);
        self.beacon_pending_validator.extend(beacon_candidates);
    }

    /// Keys of `instructions` that stake something already present.
    pub fn duplicate_stakers(&self, instructions: &[Instruction]) -> Option<CommitteeKey> {
        let mut seen = BTreeSet::new();
        instructions
            .iter()
            .filter_map(|instruction| match instruction {
                Instruction::Stake { entries, .. } => Some(entries),
                _ => None,
            })
            .flatten()
            .find(|entry| self.contains_key(&entry.key) || !seen.insert(entry.key.clone()))
            .map(|entry| entry.key.clone())
    }
}
