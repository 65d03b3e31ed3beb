//! Block production.

use super::BeaconChainService;
use crate::aggregator::assemble_instructions;
use crate::domain::{
    instruction_hash, instruction_merkle_root, shard_state_hash, BeaconBestState, BeaconBlock,
    BeaconBlockBody, BeaconBlockHeader, BeaconError, BeaconResult, CommitteeVotes, Instruction,
    ShardToBeaconBlock,
};
use crate::ports::{BlockStorage, EventBus, RandomOracle, ShardToBeaconPool, SignatureVerifier};
use shared_types::{CommitteeKey, ZERO_HASH};
use tracing::{debug, info};

impl<P, S, O, B, E> BeaconChainService<P, S, O, B, E>
where
    P: ShardToBeaconPool + 'static,
    S: SignatureVerifier + 'static,
    O: RandomOracle + 'static,
    B: BlockStorage + 'static,
    E: EventBus + 'static,
{
    /// Assemble the successor of the current best block.
    ///
    /// State roots are derived by applying the block to a private clone;
    /// signatures are left for the caller.
    pub(super) async fn build_block(
        &self,
        proposer: &CommitteeKey,
        round: u32,
        start_time: i64,
    ) -> BeaconResult<BeaconBlock> {
        let snapshot = self.state.snapshot();

        if round == 0 {
            return Err(BeaconError::MalformedBlock("round must start at 1".into()));
        }
        let expected = snapshot
            .producer_for_round(round)
            .ok_or_else(|| BeaconError::Transition("beacon committee is empty".into()))?;
        if expected != proposer {
            return Err(BeaconError::ProducerMismatch {
                expected: expected.clone(),
                actual: proposer.clone(),
            });
        }
        if start_time <= snapshot.best_block_timestamp {
            return Err(BeaconError::WrongTimestamp {
                block: start_time,
                parent: snapshot.best_block_timestamp,
            });
        }

        let height = snapshot.beacon_height + 1;
        let batches = self.aggregator.collect(&snapshot).await;
        let mut instructions = assemble_instructions(&snapshot, &batches, height);
        if let Some(random) = self.random_instruction(&snapshot, height).await? {
            instructions.push(random);
        }

        let body = BeaconBlockBody {
            shard_states: batches
                .iter()
                .map(|(shard_id, blocks)| {
                    (
                        *shard_id,
                        blocks.iter().map(ShardToBeaconBlock::state_record).collect(),
                    )
                })
                .collect(),
            instructions,
        };
        let header = BeaconBlockHeader {
            producer: proposer.clone(),
            version: snapshot.params.block_version,
            height,
            epoch: snapshot.next_epoch(),
            round,
            timestamp: start_time,
            propose_time: start_time,
            previous_block_hash: snapshot.best_block_hash,
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

        let mut probe = (*snapshot).clone();
        probe.apply_block(&block)?;
        block.header.set_state_roots(&probe.roots());

        info!(
            height,
            round,
            shards = block.body.shard_states.len(),
            instructions = block.body.instructions.len(),
            "Built beacon block"
        );
        Ok(block)
    }

    /// Random instruction for `height`, once the oracle has moved past the
    /// epoch's snapshot timestamp.
    async fn random_instruction(
        &self,
        state: &BeaconBestState,
        height: u64,
    ) -> BeaconResult<Option<Vec<String>>> {
        if !state
            .epoch_controller()
            .accepts_random(height, state.is_get_random_number)
        {
            return Ok(None);
        }
        let oracle_now = self
            .random_oracle
            .current_timestamp()
            .await
            .map_err(BeaconError::Oracle)?;
        if oracle_now <= state.current_random_timestamp {
            debug!(
                height,
                oracle_now,
                requested = state.current_random_timestamp,
                "Random number not available yet"
            );
            return Ok(None);
        }
        let (btc_height, oracle_timestamp, nonce) = self
            .random_oracle
            .nonce_by_timestamp(state.current_random_timestamp)
            .await
            .map_err(BeaconError::Oracle)?;
        Ok(Some(
            Instruction::Random {
                nonce,
                btc_height,
                request_timestamp: state.current_random_timestamp,
                oracle_timestamp,
            }
            .to_fields(),
        ))
    }
}
