//! Beacon chain service: validation pipeline, commit and production.
//!
//! # Pipeline
//!
//! ```text
//! Structural ──→ ContextCompatible ──→ Transitioned ──→ PostVerified ──→ Committed
//!                                                             │
//!                                         verify_for_signing stops here
//! ```
//!
//! Every stage before `Committed` works on an `Arc` snapshot of the best
//! state or on a private clone of it, so a failure never leaves a partial
//! mutation behind. Insertion holds the insert lock for the whole pipeline;
//! sign-only verification takes no lock at all.

mod producer;

use crate::aggregator::{assemble_instructions, ShardAggregator};
use crate::domain::{
    instruction_hash, parse_all, BeaconBestState, BeaconBlock, BeaconError, BeaconResult,
    CommitteeChange, Instruction,
};
use crate::metrics;
use crate::ports::{
    BeaconChainApi, BlockStorage, EventBus, RandomOracle, ShardToBeaconPool, SignatureVerifier,
};
use crate::state::ChainState;
use crate::validation::BeaconBlockValidator;
use async_trait::async_trait;
use shared_bus::BeaconEvent;
use shared_types::{CommitteeKey, Hash};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Beacon chain service.
pub struct BeaconChainService<P, S, O, B, E>
where
    P: ShardToBeaconPool,
    S: SignatureVerifier,
    O: RandomOracle,
    B: BlockStorage,
    E: EventBus,
{
    shard_pool: Arc<P>,
    sig_verifier: Arc<S>,
    random_oracle: Arc<O>,
    storage: Arc<B>,
    event_bus: Arc<E>,
    aggregator: ShardAggregator<P, S>,
    state: Arc<ChainState>,
}

/// Dependencies for BeaconChainService
pub struct BeaconChainDependencies<P, S, O, B, E> {
    pub shard_pool: Arc<P>,
    pub sig_verifier: Arc<S>,
    pub random_oracle: Arc<O>,
    pub storage: Arc<B>,
    pub event_bus: Arc<E>,
}

/// Where a pipeline run stops and what it checks on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineMode {
    Insert { check_votes: bool },
    SignOnly,
}

/// Output of a successful run up to `PostVerified`.
struct Verified {
    next: BeaconBestState,
    change: CommitteeChange,
}

impl<P, S, O, B, E> BeaconChainService<P, S, O, B, E>
where
    P: ShardToBeaconPool + 'static,
    S: SignatureVerifier + 'static,
    O: RandomOracle + 'static,
    B: BlockStorage + 'static,
    E: EventBus + 'static,
{
    /// Create the service on top of a genesis block and the state it produced.
    ///
    /// Both are persisted before the service is returned.
    pub async fn with_genesis(
        deps: BeaconChainDependencies<P, S, O, B, E>,
        genesis: BeaconBlock,
        genesis_state: BeaconBestState,
    ) -> BeaconResult<Self> {
        if genesis.height() != 1 || genesis_state.best_block_hash != genesis.hash() {
            return Err(BeaconError::MalformedBlock(
                "genesis state does not belong to the genesis block".into(),
            ));
        }
        deps.storage
            .store_block(genesis.hash(), genesis.height(), genesis.encode()?)
            .await
            .map_err(BeaconError::Storage)?;
        deps.storage
            .store_best_state(genesis_state.encode()?)
            .await
            .map_err(BeaconError::Storage)?;
        info!(hash = %shared_types::to_hex(&genesis.hash()), "Beacon chain initialized from genesis");

        Ok(Self {
            aggregator: ShardAggregator::new(deps.shard_pool.clone(), deps.sig_verifier.clone()),
            shard_pool: deps.shard_pool,
            sig_verifier: deps.sig_verifier,
            random_oracle: deps.random_oracle,
            storage: deps.storage,
            event_bus: deps.event_bus,
            state: Arc::new(ChainState::new(genesis_state)),
        })
    }

    async fn run_pipeline(&self, block: &BeaconBlock, mode: PipelineMode) -> BeaconResult<Verified> {
        let snapshot = self.state.snapshot();
        let height = block.height();

        debug!(height, ?mode, "Structural checks");
        let parent = self.fetch_parent(block).await?;
        BeaconBlockValidator::validate_structure(block, &parent, &snapshot.params)?;

        debug!(height, "Context checks");
        BeaconBlockValidator::validate_context(block, &snapshot, self.sig_verifier.as_ref())?;
        if let PipelineMode::Insert { check_votes: true } = mode {
            self.verify_votes(block, &snapshot).await?;
        }
        if mode == PipelineMode::SignOnly {
            self.verify_instruction_set(block, &snapshot).await?;
        }

        debug!(height, "Applying block to a private clone");
        let mut next = (*snapshot).clone();
        let change = next.apply_block(block).map_err(BeaconError::inapplicable)?;

        debug!(height, "Post-transition checks");
        BeaconBlockValidator::validate_post_transition(
            block,
            &snapshot,
            &next,
            self.sig_verifier.as_ref(),
        )?;

        Ok(Verified { next, change })
    }

    async fn fetch_parent(&self, block: &BeaconBlock) -> BeaconResult<BeaconBlock> {
        let parent_hash = block.header.previous_block_hash;
        let bytes = self
            .storage
            .fetch_block_by_hash(&parent_hash)
            .await
            .map_err(BeaconError::Storage)?
            .ok_or(BeaconError::UnknownParent(parent_hash))?;
        BeaconBlock::decode(&bytes)
    }

    /// Committee aggregate signature, off the async executor.
    async fn verify_votes(&self, block: &BeaconBlock, snapshot: &BeaconBestState) -> BeaconResult<()> {
        let block = block.clone();
        let committee = snapshot.beacon_committee.clone();
        let params = snapshot.params.clone();
        let verifier = Arc::clone(&self.sig_verifier);
        tokio::task::spawn_blocking(move || {
            BeaconBlockValidator::validate_votes(&block, &committee, &params, verifier.as_ref())
        })
        .await
        .map_err(|e| BeaconError::Task(e.to_string()))?
    }

    /// Rebuild the instruction list this node would have produced and
    /// compare it with the block's.
    async fn verify_instruction_set(
        &self,
        block: &BeaconBlock,
        snapshot: &BeaconBestState,
    ) -> BeaconResult<()> {
        let batches = self.aggregator.match_declared(block, snapshot).await?;
        let mut expected = assemble_instructions(snapshot, &batches, block.height());

        let random = parse_all(&block.body.instructions)
            .into_iter()
            .filter_map(Result::ok)
            .find(|i| matches!(i, Instruction::Random { .. }));
        if let Some(
            random @ Instruction::Random {
                nonce,
                request_timestamp,
                ..
            },
        ) = random
        {
            let valid = request_timestamp == snapshot.current_random_timestamp
                && self
                    .random_oracle
                    .verify_nonce(request_timestamp, nonce)
                    .await
                    .map_err(BeaconError::Oracle)?;
            if !valid {
                return Err(BeaconError::InvalidRandomNonce {
                    nonce,
                    timestamp: request_timestamp,
                });
            }
            expected.push(random.to_fields());
        }

        if instruction_hash(&expected) != block.header.instruction_hash {
            return Err(BeaconError::InstructionSetMismatch);
        }
        Ok(())
    }

    async fn commit(&self, block: BeaconBlock, verified: Verified) -> BeaconResult<()> {
        let hash = block.hash();
        let height = block.height();
        let Verified { next, change } = verified;

        self.storage
            .store_block(hash, height, block.encode()?)
            .await
            .map_err(BeaconError::Storage)?;
        self.storage
            .store_best_state(next.encode()?)
            .await
            .map_err(BeaconError::Storage)?;

        let best = next.summary();
        let committee = (!change.is_empty()).then(|| next.committee_snapshot());
        self.state.replace(next);

        info!(
            height,
            epoch = block.header.epoch,
            hash = %shared_types::to_hex(&hash),
            producer = %block.header.producer,
            instructions = block.body.instructions.len(),
            committee_changed = committee.is_some(),
            "Committed beacon block"
        );
        metrics::record_block_inserted();
        self.dispatch_notifications(&block, best, committee);
        Ok(())
    }

    /// Fire-and-forget pool cleanup and bus publication.
    fn dispatch_notifications(
        &self,
        block: &BeaconBlock,
        best: shared_types::BestStateSummary,
        committee: Option<shared_types::CommitteeSnapshot>,
    ) {
        let height = block.height();
        let tips = block.shard_tips();

        if !tips.is_empty() {
            let pool = Arc::clone(&self.shard_pool);
            let consumed = tips.clone();
            tokio::spawn(async move {
                pool.remove_consumed(consumed).await;
            });
        }

        let mut events = vec![
            BeaconEvent::NewBeaconBlock(block.summary()),
            BeaconEvent::NewBestState(best),
        ];
        if !tips.is_empty() {
            events.push(BeaconEvent::ShardBlocksConsumed {
                beacon_height: height,
                heights: tips,
            });
        }
        if let Some(snapshot) = committee {
            events.push(BeaconEvent::CommitteeChanged(snapshot));
        }
        self.publish_all(events);
    }

    fn reject(&self, block: &BeaconBlock, err: &BeaconError) {
        let kind = err.kind();
        metrics::record_block_rejected(kind.as_str());
        warn!(height = block.height(), kind = kind.as_str(), error = %err, "Rejected beacon block");
        self.publish_all(vec![BeaconEvent::BlockRejected {
            hash: block.hash(),
            height: block.height(),
            kind: kind.as_str().to_string(),
            reason: err.to_string(),
        }]);
    }

    fn publish_all(&self, events: Vec<BeaconEvent>) {
        let bus = Arc::clone(&self.event_bus);
        tokio::spawn(async move {
            for event in events {
                if let Err(e) = bus.publish(event).await {
                    warn!(error = %e, "Failed to publish beacon event");
                }
            }
        });
    }
}

#[async_trait]
impl<P, S, O, B, E> BeaconChainApi for BeaconChainService<P, S, O, B, E>
where
    P: ShardToBeaconPool + 'static,
    S: SignatureVerifier + 'static,
    O: RandomOracle + 'static,
    B: BlockStorage + 'static,
    E: EventBus + 'static,
{
    async fn new_block(
        &self,
        proposer: &CommitteeKey,
        round: u32,
        start_time: i64,
    ) -> BeaconResult<BeaconBlock> {
        self.build_block(proposer, round, start_time).await
    }

    async fn verify_for_signing(&self, block: &BeaconBlock) -> BeaconResult<()> {
        self.run_pipeline(block, PipelineMode::SignOnly)
            .await
            .map(|_| ())
    }

    async fn insert_block(&self, block: BeaconBlock, already_validated: bool) -> BeaconResult<()> {
        let _guard = self.state.insert_lock.lock().await;
        let hash = block.hash();

        // Known only counts once the canonical state has reached the height;
        // a block stored by a commit that failed later must run again.
        let height = block.height();
        if height <= self.state.snapshot().beacon_height
            && self
                .storage
                .block_hash_at_height(height)
                .await
                .map_err(BeaconError::Storage)?
                == Some(hash)
        {
            debug!(height, "Block already committed");
            return Ok(());
        }

        let started = Instant::now();
        let mode = PipelineMode::Insert {
            check_votes: !already_validated,
        };
        match self.run_pipeline(&block, mode).await {
            Ok(verified) => {
                self.commit(block, verified).await?;
                metrics::record_pipeline_latency(started.elapsed().as_secs_f64());
                Ok(())
            }
            Err(err) => {
                self.reject(&block, &err);
                Err(err)
            }
        }
    }

    fn best_state(&self) -> Arc<BeaconBestState> {
        self.state.snapshot()
    }

    fn best_block_hash(&self) -> Hash {
        self.state.best_block_hash()
    }
}
