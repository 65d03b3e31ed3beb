//! # qc-18-beacon-chain
//!
//! Beacon chain subsystem: block validation pipeline and committee-state
//! transition engine for a sharded network.
//!
//! ## Architecture
//!
//! The beacon chain keeps one canonical best state: beacon and shard
//! committees, pending validators, four candidate pools waiting on the
//! epoch's random number, auto-staking flags and the latest shard heights.
//! Every block moves that state forward through a fixed pipeline:
//!
//! ```text
//! Structural ──→ ContextCompatible ──→ Transitioned ──→ PostVerified ──→ Committed
//!     │                 │                    │                │              │
//!  parent,          producer,           apply to a       state roots    swap best
//!  hashes,          votes, shard        private clone    vs header      state, persist,
//!  contiguity       heights, swaps                                      notify bus
//! ```
//!
//! Failure at any stage leaves the canonical state untouched.
//!
//! ### Epoch cycle
//!
//! Staked keys wait in the next-random pools until the epoch's random time,
//! are snapshotted into the current-random pools, and are assigned once a
//! `random` instruction arrives: shard candidates round-robin into shard
//! pending lists, beacon candidates shuffled into the beacon pending list.
//! At the swap height the beacon committee rotates by at most `swap_offset`
//! keys.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qc_18_beacon_chain::{BeaconChainService, BeaconChainDependencies, GenesisBuilder};
//!
//! let (genesis, state) = GenesisBuilder::new(params)
//!     .beacon_keys(beacon_keys)
//!     .shard_keys(shard_keys)
//!     .build()?;
//! let service = BeaconChainService::with_genesis(deps, genesis, state).await?;
//!
//! let block = service.new_block(&proposer, 1, now).await?;
//! service.verify_for_signing(&block).await?;
//! service.insert_block(block, true).await?;
//! ```

pub mod adapters;
pub mod aggregator;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod state;
pub mod validation;

// Re-export main types
pub use adapters::{
    AcceptAllVerifier, BusEventPublisher, FixedRandomOracle, InMemoryBlockStorage,
    InMemoryShardPool, RecordingEventBus,
};
pub use aggregator::{assemble_instructions, ShardAggregator, ShardBatches};
pub use domain::{
    BeaconBestState, BeaconBlock, BeaconBlockBody, BeaconBlockHeader, BeaconError, BeaconParams,
    BeaconResult, CommitteeChange, CommitteeVotes, ConfigError, EpochController, EpochPhase,
    ErrorKind, GenesisBuilder, Instruction, InstructionError, ShardToBeaconBlock, StateRoots,
    SwapBoundary,
};
pub use ports::{
    BeaconChainApi, BlockStorage, EventBus, RandomOracle, ShardToBeaconPool, SignatureVerifier,
};
pub use service::{BeaconChainDependencies, BeaconChainService};
pub use validation::BeaconBlockValidator;
