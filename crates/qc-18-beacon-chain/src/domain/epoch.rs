//! Epoch and randomness phase controller.
//!
//! Heights are 1-based and an epoch spans `epoch_length` heights, so the
//! first height of an epoch satisfies `height % epoch_length == 1`.

use super::{BeaconParams, SwapBoundary};

/// Where a height sits within its epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochPhase {
    /// First height: the random flag resets.
    EpochStart,
    /// Candidates accumulate in the next-random pools.
    CollectingCandidates,
    /// Next-random pools are snapshotted into the current-random pools.
    RandomTime,
    /// A random number may be accepted, once.
    AwaitingRandom,
}

/// Derives epoch phases from the network constants.
#[derive(Debug, Clone, Copy)]
pub struct EpochController {
    epoch_length: u64,
    random_time: u64,
    swap_boundary: SwapBoundary,
}

impl EpochController {
    pub fn new(params: &BeaconParams) -> Self {
        Self {
            epoch_length: params.epoch_length,
            random_time: params.random_time,
            swap_boundary: params.swap_boundary,
        }
    }

    /// 1-based position of `height` within its epoch.
    pub fn position(&self, height: u64) -> u64 {
        (height.saturating_sub(1) % self.epoch_length) + 1
    }

    pub fn phase(&self, height: u64) -> EpochPhase {
        let position = self.position(height);
        if position == self.random_time {
            EpochPhase::RandomTime
        } else if position == 1 {
            EpochPhase::EpochStart
        } else if position < self.random_time {
            EpochPhase::CollectingCandidates
        } else {
            EpochPhase::AwaitingRandom
        }
    }

    /// First height of an epoch other than genesis.
    pub fn is_epoch_start(&self, height: u64) -> bool {
        height > 1 && height % self.epoch_length == 1
    }

    /// Epoch of the block at `height`, given the parent's epoch.
    pub fn epoch_for(&self, height: u64, parent_epoch: u64) -> u64 {
        if height <= 1 {
            1
        } else if self.is_epoch_start(height) {
            parent_epoch + 1
        } else {
            parent_epoch
        }
    }

    pub fn is_random_time(&self, height: u64) -> bool {
        height > 1 && self.position(height) == self.random_time
    }

    /// A `random` instruction at `height` is honored only after random time
    /// and only if the epoch has none yet.
    pub fn accepts_random(&self, height: u64, already_got: bool) -> bool {
        !already_got && height > 1 && self.position(height) > self.random_time
    }

    /// Height at which the beacon committee swap fires.
    pub fn is_swap_height(&self, height: u64) -> bool {
        if height <= 1 {
            return false;
        }
        match self.swap_boundary {
            SwapBoundary::EpochEnd => height % self.epoch_length == 0,
            SwapBoundary::BeforeEpochEnd => height % self.epoch_length == self.epoch_length - 1,
        }
    }
}
