//! Cross-shard aggregation.
//!
//! Pulls shard-to-beacon summaries from the pool, checks them against the
//! shard committees, and folds their instructions into the beacon
//! instruction list. Used by block production and by sign-only
//! verification; plain insertion trusts the declared shard states.

use crate::domain::{
    swap_validator, BeaconBestState, BeaconBlock, BeaconError, BeaconResult, Instruction,
    ShardToBeaconBlock, StakeEntry, SwapTarget,
};
use crate::metrics;
use crate::ports::{ShardToBeaconPool, SignatureVerifier};
use shared_types::{CommitteeKey, ShardId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shard summaries accepted for one beacon block, per shard in height order.
pub type ShardBatches = BTreeMap<ShardId, Vec<ShardToBeaconBlock>>;

pub struct ShardAggregator<P, S>
where
    P: ShardToBeaconPool,
    S: SignatureVerifier,
{
    pool: Arc<P>,
    verifier: Arc<S>,
}

impl<P, S> ShardAggregator<P, S>
where
    P: ShardToBeaconPool,
    S: SignatureVerifier,
{
    pub fn new(pool: Arc<P>, verifier: Arc<S>) -> Self {
        Self { pool, verifier }
    }

    /// Batches for a new block: per shard, the longest signed run that
    /// continues the recorded height, capped at the batch maximum.
    pub async fn collect(&self, state: &BeaconBestState) -> ShardBatches {
        let available = self.pool.get_valid_blocks(&state.best_shard_height).await;
        let max = state.params.max_shard_blocks_per_batch;
        let mut batches = ShardBatches::new();

        for (shard_id, blocks) in available {
            if shard_id >= state.params.active_shards {
                warn!(shard_id, "Pool offered blocks for an inactive shard");
                continue;
            }
            let mut expected = state.best_shard_height.get(&shard_id).copied().unwrap_or(0) + 1;
            let mut accepted = Vec::new();
            for block in blocks.into_iter().take(max) {
                if block.height != expected {
                    debug!(shard_id, expected, found = block.height, "Shard batch stops at a gap");
                    break;
                }
                if let Err(reason) = self.verify_summary(state, &block, accepted.is_empty()) {
                    warn!(shard_id, height = block.height, %reason, "Shard batch stops at a bad signature");
                    break;
                }
                expected += 1;
                accepted.push(block);
            }
            if !accepted.is_empty() {
                batches.insert(shard_id, accepted);
            }
        }
        batches
    }

    /// Pool summaries matching the block's declared shard states exactly.
    pub async fn match_declared(
        &self,
        block: &BeaconBlock,
        state: &BeaconBestState,
    ) -> BeaconResult<ShardBatches> {
        let mut available = self.pool.get_valid_blocks(&state.best_shard_height).await;
        let mut batches = ShardBatches::new();

        for (shard_id, records) in &block.body.shard_states {
            let pooled = available.remove(shard_id).unwrap_or_default();
            if pooled.len() < records.len() {
                return Err(BeaconError::MissingShardBlocks {
                    shard_id: *shard_id,
                    declared: records.len(),
                    available: pooled.len(),
                });
            }
            let batch: Vec<ShardToBeaconBlock> =
                pooled.into_iter().take(records.len()).collect();
            for (position, (record, summary)) in records.iter().zip(&batch).enumerate() {
                if !summary.matches_record(record) {
                    return Err(BeaconError::ShardStateMismatch {
                        shard_id: *shard_id,
                        height: record.height,
                    });
                }
                self.verify_summary(state, summary, position == 0)
                    .map_err(|reason| BeaconError::InvalidShardSignature {
                        shard_id: *shard_id,
                        height: record.height,
                        reason,
                    })?;
            }
            batches.insert(*shard_id, batch);
        }
        Ok(batches)
    }

    /// Aggregate signature against the shard's known committee.
    ///
    /// The first block of a batch may already be signed by the committee
    /// after the shard's next swap.
    fn verify_summary(
        &self,
        state: &BeaconBestState,
        summary: &ShardToBeaconBlock,
        first_in_batch: bool,
    ) -> Result<(), String> {
        let committee = state.shard_committee_of(summary.shard_id);
        let result = self.verify_with(committee, summary);
        match result {
            Err(reason) if first_in_batch => {
                let rotated = swap_validator(
                    state.shard_pending_of(summary.shard_id),
                    committee,
                    state.params.max_shard_committee_size,
                    state.params.swap_offset,
                );
                if rotated.is_noop() {
                    return Err(reason);
                }
                self.verify_with(&rotated.committee, summary).map_err(|_| reason)
            }
            other => other,
        }
    }

    fn verify_with(&self, committee: &[CommitteeKey], summary: &ShardToBeaconBlock) -> Result<(), String> {
        self.verifier.validate_agg_signature(
            &summary.validators_idx,
            committee,
            &summary.agg_sig,
            &summary.r,
            &summary.hash,
        )
    }
}

/// Instructions a block at `height` must carry, minus the random
/// instruction.
///
/// Order: stakes, stop-auto-stakes, unstakes, shard swaps, pass-through
/// instructions, one `returnstaking` for duplicate stakes, then the beacon
/// swap when `height` is a swap height.
pub fn assemble_instructions(
    state: &BeaconBestState,
    batches: &ShardBatches,
    height: u64,
) -> Vec<Vec<String>> {
    let mut stakes = Vec::new();
    let mut stop_auto_stakes = Vec::new();
    let mut unstakes = Vec::new();
    let mut swaps = Vec::new();
    let mut passthrough = Vec::new();
    let mut duplicates: Vec<StakeEntry> = Vec::new();
    let mut seen: BTreeSet<CommitteeKey> = BTreeSet::new();

    for (shard_id, blocks) in batches {
        for block in blocks {
            for fields in &block.instructions {
                let instruction = match Instruction::parse(fields) {
                    Ok(instruction) => instruction,
                    Err(err) => {
                        warn!(shard_id, height = block.height, fields = ?fields, error = %err, "Dropping malformed shard instruction");
                        metrics::record_instruction_dropped(err.kind_label());
                        continue;
                    }
                };
                match instruction {
                    Instruction::Stake { chain, entries } => {
                        let (fresh, dup): (Vec<StakeEntry>, Vec<StakeEntry>) = entries
                            .into_iter()
                            .partition(|e| !state.contains_key(&e.key) && seen.insert(e.key.clone()));
                        duplicates.extend(dup);
                        if !fresh.is_empty() {
                            stakes.push(Instruction::Stake { chain, entries: fresh });
                        }
                    }
                    Instruction::StopAutoStake { .. } => stop_auto_stakes.push(instruction),
                    Instruction::Unstake { .. } => unstakes.push(instruction),
                    Instruction::Swap {
                        target: SwapTarget::Shard(target),
                        ..
                    } if target == *shard_id => swaps.push(instruction),
                    Instruction::Swap { .. } | Instruction::Random { .. } | Instruction::ReturnStake { .. } => {
                        warn!(shard_id, tag = instruction.tag(), "Ignoring instruction a shard may not emit");
                    }
                    Instruction::Set { .. } | Instruction::Del { .. } | Instruction::Opaque(_) => {
                        passthrough.push(instruction)
                    }
                }
            }
        }
    }

    let mut assembled: Vec<Instruction> = stakes;
    assembled.extend(stop_auto_stakes);
    assembled.extend(unstakes);
    assembled.extend(swaps);
    assembled.extend(passthrough);

    if !duplicates.is_empty() {
        debug!(count = duplicates.len(), "Returning duplicate stakes");
        let tx_ids = duplicates
            .iter()
            .map(|e| e.tx_id.clone())
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        assembled.push(Instruction::ReturnStake {
            keys: duplicates.into_iter().map(|e| e.key).collect(),
            tx_ids,
        });
    }

    if state.epoch_controller().is_swap_height(height) {
        let outcome = swap_validator(
            &state.beacon_pending_validator,
            &state.beacon_committee,
            state.params.max_beacon_committee_size,
            state.params.swap_offset,
        );
        if !outcome.is_noop() {
            assembled.push(Instruction::Swap {
                target: SwapTarget::Beacon,
                in_keys: outcome.in_keys,
                out_keys: outcome.out_keys,
            });
        }
    }

    assembled.iter().map(Instruction::to_fields).collect()
}
