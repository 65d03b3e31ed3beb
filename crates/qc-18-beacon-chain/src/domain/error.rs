//! Error types for the beacon chain core.

use super::{InstructionError, RootKind};
use shared_types::{CommitteeKey, Hash, ShardId};

/// Error classes the caller uses to decide between retry and rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed header or body. Never valid as-is.
    Structural,
    /// Disagrees with the current canonical state. May become valid later.
    Context,
    /// An instruction cannot be applied to the state. Only raised while
    /// producing; a verified block that fails to apply reports
    /// `PostVerification` instead.
    InstructionSemantic,
    /// Shard summaries missing, out of order or badly signed.
    Aggregation,
    /// Roots derived from the advanced state differ from the header.
    PostVerification,
    /// Oracle or storage failure.
    ExternalDependency,
}

impl ErrorKind {
    /// Whether the same block may succeed on a later attempt.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Context | Self::Aggregation | Self::ExternalDependency
        )
    }

    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Context => "context",
            Self::InstructionSemantic => "instruction_semantic",
            Self::Aggregation => "aggregation",
            Self::PostVerification => "post_verification",
            Self::ExternalDependency => "external_dependency",
        }
    }
}

/// Beacon chain errors.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    // === Structural ===
    #[error("Unsupported block version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },

    #[error("Malformed producer key: {0:?}")]
    MalformedProducer(String),

    #[error("Malformed block: {0}")]
    MalformedBlock(String),

    #[error("Wrong height: parent {parent}, block {block}")]
    WrongHeight { parent: u64, block: u64 },

    #[error("Wrong epoch at height {height}: expected {expected}, got {actual}")]
    WrongEpoch {
        height: u64,
        expected: u64,
        actual: u64,
    },

    #[error("Timestamp not increasing: block {block} <= parent {parent}")]
    WrongTimestamp { block: i64, parent: i64 },

    #[error("Shard {shard_id} state heights not contiguous: {previous} then {next}")]
    NonContiguousShardState {
        shard_id: ShardId,
        previous: u64,
        next: u64,
    },

    #[error("Shard state hash mismatch")]
    ShardStateHashMismatch,

    #[error("Instruction hash mismatch")]
    InstructionHashMismatch,

    #[error("Instruction merkle root mismatch")]
    InstructionMerkleRootMismatch,

    #[error("Committee index {0} voted more than once")]
    DuplicateVote(usize),

    // === Context ===
    #[error("Unknown parent block: {}", shared_types::to_hex(.0))]
    UnknownParent(Hash),

    #[error("Producer mismatch: expected {expected}, got {actual}")]
    ProducerMismatch {
        expected: CommitteeKey,
        actual: CommitteeKey,
    },

    #[error("Invalid producer signature from {0}")]
    InvalidProducerSignature(CommitteeKey),

    #[error("Invalid committee aggregate signature: {0}")]
    InvalidCommitteeSignature(String),

    #[error("Insufficient votes: {votes} of {committee_size}")]
    InsufficientVotes { votes: usize, committee_size: usize },

    #[error("Vote index {index} outside committee of {committee_size}")]
    VoteIndexOutOfRange { index: usize, committee_size: usize },

    #[error("Previous hash {} does not match best block {}", shared_types::to_hex(.declared), shared_types::to_hex(.best))]
    BestBlockMismatch { declared: Hash, best: Hash },

    #[error("Height mismatch: expected {expected}, got {actual}")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("Epoch mismatch: expected {expected}, got {actual}")]
    EpochMismatch { expected: u64, actual: u64 },

    #[error("Shard {shard_id} height regression: first {first}, best {best}")]
    ShardHeightRegression {
        shard_id: ShardId,
        first: u64,
        best: u64,
    },

    #[error("Shard {shard_id} height gap: first {first}, best {best}")]
    ShardHeightGap {
        shard_id: ShardId,
        first: u64,
        best: u64,
    },

    #[error("Shard {shard_id} never reported, first height must be 1, got {first}")]
    UnknownShardHeight { shard_id: ShardId, first: u64 },

    #[error("Staker already known: {0}")]
    DuplicateStaker(CommitteeKey),

    #[error("Swap of {key} does not match {list}")]
    SwapMismatch {
        key: CommitteeKey,
        list: &'static str,
    },

    #[error("Random nonce {nonce} rejected for timestamp {timestamp}")]
    InvalidRandomNonce { nonce: i64, timestamp: i64 },

    // === Instruction semantic ===
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(#[from] InstructionError),

    #[error("State transition failed: {0}")]
    Transition(String),

    #[error("{role} committee size {size} outside [{min}, {max}]")]
    CommitteeSizeOutOfBounds {
        role: String,
        size: usize,
        min: usize,
        max: usize,
    },

    // === Aggregation ===
    #[error("Shard {shard_id}: pool has {available} blocks, block declares {declared}")]
    MissingShardBlocks {
        shard_id: ShardId,
        declared: usize,
        available: usize,
    },

    #[error("Shard {shard_id} state at height {height} differs from pool")]
    ShardStateMismatch { shard_id: ShardId, height: u64 },

    #[error("Invalid aggregate signature on shard {shard_id} block {height}: {reason}")]
    InvalidShardSignature {
        shard_id: ShardId,
        height: u64,
        reason: String,
    },

    // === Post verification ===
    #[error("{root:?} mismatch: header {}, derived {}", shared_types::to_hex(.declared), shared_types::to_hex(.derived))]
    RootMismatch {
        root: RootKind,
        declared: Hash,
        derived: Hash,
    },

    #[error("Instruction set differs from the one this node derives")]
    InstructionSetMismatch,

    #[error("Block does not apply to the best state: {0}")]
    InapplicableBlock(#[source] Box<BeaconError>),

    // === External dependency ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Random oracle error: {0}")]
    Oracle(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl BeaconError {
    pub fn kind(&self) -> ErrorKind {
        use BeaconError::*;
        match self {
            UnsupportedVersion { .. }
            | MalformedProducer(_)
            | MalformedBlock(_)
            | WrongHeight { .. }
            | WrongEpoch { .. }
            | WrongTimestamp { .. }
            | NonContiguousShardState { .. }
            | ShardStateHashMismatch
            | InstructionHashMismatch
            | InstructionMerkleRootMismatch
            | DuplicateVote(_) => ErrorKind::Structural,

            UnknownParent(_)
            | ProducerMismatch { .. }
            | InvalidProducerSignature(_)
            | InvalidCommitteeSignature(_)
            | InsufficientVotes { .. }
            | VoteIndexOutOfRange { .. }
            | BestBlockMismatch { .. }
            | HeightMismatch { .. }
            | EpochMismatch { .. }
            | ShardHeightRegression { .. }
            | ShardHeightGap { .. }
            | UnknownShardHeight { .. }
            | DuplicateStaker(_)
            | SwapMismatch { .. }
            | InvalidRandomNonce { .. } => ErrorKind::Context,

            InvalidInstruction(_) | Transition(_) | CommitteeSizeOutOfBounds { .. } => {
                ErrorKind::InstructionSemantic
            }

            MissingShardBlocks { .. }
            | ShardStateMismatch { .. }
            | InvalidShardSignature { .. } => ErrorKind::Aggregation,

            RootMismatch { .. } | InstructionSetMismatch | InapplicableBlock(_) => {
                ErrorKind::PostVerification
            }

            Storage(_) | Oracle(_) | Task(_) => ErrorKind::ExternalDependency,
        }
    }

    /// Reclassify a transition failure of a block under verification.
    pub fn inapplicable(self) -> Self {
        match self.kind() {
            ErrorKind::InstructionSemantic => BeaconError::InapplicableBlock(Box::new(self)),
            _ => self,
        }
    }
}

/// Result type for beacon chain operations.
pub type BeaconResult<T> = Result<T, BeaconError>;
