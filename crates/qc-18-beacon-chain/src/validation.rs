//! Stateless validation stages.
//!
//! Each stage is a pure function of its inputs; the service decides which
//! state snapshot to feed in and in which order the stages run.

use crate::domain::{
    check_swaps, first_gap, instruction_hash, instruction_merkle_root, parse_all, shard_state_hash,
    BeaconBestState, BeaconBlock, BeaconError, BeaconParams, BeaconResult, EpochController,
    Instruction,
};
use crate::ports::SignatureVerifier;
use shared_types::CommitteeKey;
use std::collections::BTreeSet;

/// Stateless validation logic for beacon blocks.
pub struct BeaconBlockValidator;

impl BeaconBlockValidator {
    /// Checks that need nothing but the block and its parent.
    pub fn validate_structure(
        block: &BeaconBlock,
        parent: &BeaconBlock,
        params: &BeaconParams,
    ) -> BeaconResult<()> {
        let header = &block.header;

        if header.version != params.block_version {
            return Err(BeaconError::UnsupportedVersion {
                expected: params.block_version,
                actual: header.version,
            });
        }
        if !header.producer.is_well_formed() {
            return Err(BeaconError::MalformedProducer(
                header.producer.as_str().to_string(),
            ));
        }
        if header.round == 0 {
            return Err(BeaconError::MalformedBlock("round must start at 1".into()));
        }
        if header.previous_block_hash != parent.hash() {
            return Err(BeaconError::UnknownParent(header.previous_block_hash));
        }
        if header.height != parent.header.height + 1 {
            return Err(BeaconError::WrongHeight {
                parent: parent.header.height,
                block: header.height,
            });
        }
        let expected_epoch =
            EpochController::new(params).epoch_for(header.height, parent.header.epoch);
        if header.epoch != expected_epoch {
            return Err(BeaconError::WrongEpoch {
                height: header.height,
                expected: expected_epoch,
                actual: header.epoch,
            });
        }
        if header.timestamp <= parent.header.timestamp {
            return Err(BeaconError::WrongTimestamp {
                block: header.timestamp,
                parent: parent.header.timestamp,
            });
        }

        for (shard_id, records) in &block.body.shard_states {
            if *shard_id >= params.active_shards {
                return Err(BeaconError::MalformedBlock(format!(
                    "shard {shard_id} is not active"
                )));
            }
            if records.is_empty() {
                return Err(BeaconError::MalformedBlock(format!(
                    "shard {shard_id} has an empty state list"
                )));
            }
            if let Some((previous, next)) = first_gap(records.iter().map(|r| &r.height)) {
                return Err(BeaconError::NonContiguousShardState {
                    shard_id: *shard_id,
                    previous,
                    next,
                });
            }
        }

        if shard_state_hash(&block.body.shard_states) != header.shard_state_hash {
            return Err(BeaconError::ShardStateHashMismatch);
        }
        if instruction_hash(&block.body.instructions) != header.instruction_hash {
            return Err(BeaconError::InstructionHashMismatch);
        }
        if instruction_merkle_root(&block.body.instructions) != header.instruction_merkle_root {
            return Err(BeaconError::InstructionMerkleRootMismatch);
        }
        Ok(())
    }

    /// Checks against the canonical best state, read-only.
    ///
    /// Committee votes are checked separately by [`Self::validate_votes`].
    pub fn validate_context<S>(
        block: &BeaconBlock,
        state: &BeaconBestState,
        verifier: &S,
    ) -> BeaconResult<()>
    where
        S: SignatureVerifier + ?Sized,
    {
        let header = &block.header;

        Self::validate_producer(block, state, verifier)?;

        if header.previous_block_hash != state.best_block_hash {
            return Err(BeaconError::BestBlockMismatch {
                declared: header.previous_block_hash,
                best: state.best_block_hash,
            });
        }
        if header.height != state.beacon_height + 1 {
            return Err(BeaconError::HeightMismatch {
                expected: state.beacon_height + 1,
                actual: header.height,
            });
        }
        let expected_epoch = state.next_epoch();
        if header.epoch != expected_epoch {
            return Err(BeaconError::EpochMismatch {
                expected: expected_epoch,
                actual: header.epoch,
            });
        }

        Self::validate_shard_heights(block, state)?;

        let instructions: Vec<Instruction> = parse_all(&block.body.instructions)
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        if let Some(key) = state.duplicate_stakers(&instructions) {
            return Err(BeaconError::DuplicateStaker(key));
        }
        check_swaps(state, &instructions)
    }

    /// Producer chosen by rotation, and its signature over the header hash.
    pub fn validate_producer<S>(
        block: &BeaconBlock,
        state: &BeaconBestState,
        verifier: &S,
    ) -> BeaconResult<()>
    where
        S: SignatureVerifier + ?Sized,
    {
        let header = &block.header;
        let expected = state
            .producer_for_round(header.round)
            .ok_or_else(|| BeaconError::Transition("beacon committee is empty".into()))?;
        if expected != &header.producer {
            return Err(BeaconError::ProducerMismatch {
                expected: expected.clone(),
                actual: header.producer.clone(),
            });
        }
        if !verifier.verify_producer_signature(&header.producer, &block.hash(), &block.producer_signature)
        {
            return Err(BeaconError::InvalidProducerSignature(header.producer.clone()));
        }
        Ok(())
    }

    /// Shard heights must continue exactly where the best state left off.
    pub fn validate_shard_heights(block: &BeaconBlock, state: &BeaconBestState) -> BeaconResult<()> {
        for (shard_id, records) in &block.body.shard_states {
            let Some(first) = records.first().map(|r| r.height) else {
                continue;
            };
            match state.best_shard_height.get(shard_id).copied() {
                None if first != 1 => {
                    return Err(BeaconError::UnknownShardHeight {
                        shard_id: *shard_id,
                        first,
                    })
                }
                None => {}
                Some(best) if first <= best => {
                    return Err(BeaconError::ShardHeightRegression {
                        shard_id: *shard_id,
                        first,
                        best,
                    })
                }
                Some(best) if first != best + 1 => {
                    return Err(BeaconError::ShardHeightGap {
                        shard_id: *shard_id,
                        first,
                        best,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Committee aggregate signature over a set of distinct, in-range
    /// committee indices.
    ///
    /// Small committees (at or below `quorum_threshold_committee_size`) skip
    /// the check entirely.
    pub fn validate_votes<S>(
        block: &BeaconBlock,
        committee: &[CommitteeKey],
        params: &BeaconParams,
        verifier: &S,
    ) -> BeaconResult<()>
    where
        S: SignatureVerifier + ?Sized,
    {
        if committee.len() <= params.quorum_threshold_committee_size {
            return Ok(());
        }
        let votes = &block.votes;
        let mut signers = BTreeSet::new();
        for &index in &votes.validators_idx {
            if index >= committee.len() {
                return Err(BeaconError::VoteIndexOutOfRange {
                    index,
                    committee_size: committee.len(),
                });
            }
            if !signers.insert(index) {
                return Err(BeaconError::DuplicateVote(index));
            }
        }
        if signers.len() <= committee.len() / 2 {
            return Err(BeaconError::InsufficientVotes {
                votes: signers.len(),
                committee_size: committee.len(),
            });
        }
        verifier
            .validate_agg_signature(
                &votes.validators_idx,
                committee,
                &votes.agg_sig,
                &votes.r,
                &block.hash(),
            )
            .map_err(BeaconError::InvalidCommitteeSignature)
    }

    /// Roots of the advanced clone against the header, then the producer
    /// against the pre-transition committee.
    pub fn validate_post_transition<S>(
        block: &BeaconBlock,
        before: &BeaconBestState,
        after: &BeaconBestState,
        verifier: &S,
    ) -> BeaconResult<()>
    where
        S: SignatureVerifier + ?Sized,
    {
        let declared = block.header.state_roots().entries();
        let derived = after.roots().entries();
        for ((root, declared), (_, derived)) in declared.into_iter().zip(derived) {
            if declared != derived {
                return Err(BeaconError::RootMismatch {
                    root,
                    declared,
                    derived,
                });
            }
        }
        Self::validate_producer(block, before, verifier)
    }
}
