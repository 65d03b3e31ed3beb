//! Network constants fixed at genesis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Height at which the end-of-epoch beacon swap fires.
///
/// Deployed networks have used both conventions, so the boundary is a
/// protocol constant chosen at genesis and never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SwapBoundary {
    /// `height % epoch_length == 0`, the last height of the epoch.
    #[default]
    EpochEnd,
    /// `height % epoch_length == epoch_length - 1`.
    BeforeEpochEnd,
}

/// Parameter validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("epoch_length must be at least 2, got {0}")]
    EpochTooShort(u64),

    #[error("random_time must be in 1..{epoch_length}, got {random_time}")]
    RandomTimeOutOfRange { random_time: u64, epoch_length: u64 },

    #[error("active_shards must be positive")]
    NoShards,

    #[error("{role} committee bounds inverted: min {min} > max {max}")]
    InvertedBounds {
        role: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{0} must be positive")]
    ZeroOffset(&'static str),

    #[error("{0} committee needs at least one member")]
    EmptyCommittee(&'static str),
}

/// Beacon network parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconParams {
    pub block_version: u32,
    pub epoch_length: u64,
    /// Position in the epoch at which candidates are snapshotted.
    pub random_time: u64,
    pub active_shards: u8,
    pub min_beacon_committee_size: usize,
    pub max_beacon_committee_size: usize,
    pub min_shard_committee_size: usize,
    pub max_shard_committee_size: usize,
    /// Maximum keys exchanged by one swap.
    pub swap_offset: usize,
    /// Pending-list capacity per shard for candidate assignment.
    pub assign_offset: usize,
    pub max_shard_blocks_per_batch: usize,
    pub swap_boundary: SwapBoundary,
    /// Committee aggregate signatures are only enforced above this size.
    pub quorum_threshold_committee_size: usize,
}

impl Default for BeaconParams {
    fn default() -> Self {
        Self {
            block_version: 1,
            epoch_length: 350,
            random_time: 175,
            active_shards: 8,
            min_beacon_committee_size: 4,
            max_beacon_committee_size: 32,
            min_shard_committee_size: 4,
            max_shard_committee_size: 32,
            swap_offset: 4,
            assign_offset: 8,
            max_shard_blocks_per_batch: 50,
            swap_boundary: SwapBoundary::EpochEnd,
            quorum_threshold_committee_size: 3,
        }
    }
}

impl BeaconParams {
    /// Small network used by tests and local devnets.
    pub fn for_testing() -> Self {
        Self {
            epoch_length: 10,
            random_time: 5,
            active_shards: 2,
            min_beacon_committee_size: 4,
            max_beacon_committee_size: 6,
            min_shard_committee_size: 2,
            max_shard_committee_size: 4,
            swap_offset: 2,
            assign_offset: 2,
            max_shard_blocks_per_batch: 5,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epoch_length < 2 {
            return Err(ConfigError::EpochTooShort(self.epoch_length));
        }
        if self.random_time == 0 || self.random_time >= self.epoch_length {
            return Err(ConfigError::RandomTimeOutOfRange {
                random_time: self.random_time,
                epoch_length: self.epoch_length,
            });
        }
        if self.active_shards == 0 {
            return Err(ConfigError::NoShards);
        }
        if self.min_beacon_committee_size == 0 {
            return Err(ConfigError::EmptyCommittee("beacon"));
        }
        if self.min_shard_committee_size == 0 {
            return Err(ConfigError::EmptyCommittee("shard"));
        }
        if self.min_beacon_committee_size > self.max_beacon_committee_size {
            return Err(ConfigError::InvertedBounds {
                role: "beacon",
                min: self.min_beacon_committee_size,
                max: self.max_beacon_committee_size,
            });
        }
        if self.min_shard_committee_size > self.max_shard_committee_size {
            return Err(ConfigError::InvertedBounds {
                role: "shard",
                min: self.min_shard_committee_size,
                max: self.max_shard_committee_size,
            });
        }
        if self.swap_offset == 0 {
            return Err(ConfigError::ZeroOffset("swap_offset"));
        }
        if self.assign_offset == 0 {
            return Err(ConfigError::ZeroOffset("assign_offset"));
        }
        if self.max_shard_blocks_per_batch == 0 {
            return Err(ConfigError::ZeroOffset("max_shard_blocks_per_batch"));
        }
        Ok(())
    }

    /// Iterator over the active shard ids.
    pub fn shard_ids(&self) -> impl Iterator<Item = shared_types::ShardId> {
        0..self.active_shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(BeaconParams::default().validate().is_ok());
        assert!(BeaconParams::for_testing().validate().is_ok());
    }

    #[test]
    fn test_random_time_must_fall_inside_epoch() {
        let params = BeaconParams {
            random_time: 10,
            ..BeaconParams::for_testing()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::RandomTimeOutOfRange {
                random_time: 10,
                epoch_length: 10
            })
        );
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let params = BeaconParams {
            min_shard_committee_size: 9,
            ..BeaconParams::for_testing()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvertedBounds { role: "shard", .. })
        ));
    }

    #[test]
    fn test_zero_committee_minimum_rejected() {
        let params = BeaconParams {
            min_beacon_committee_size: 0,
            ..BeaconParams::for_testing()
        };
        assert_eq!(params.validate(), Err(ConfigError::EmptyCommittee("beacon")));

        let params = BeaconParams {
            min_shard_committee_size: 0,
            ..BeaconParams::for_testing()
        };
        assert_eq!(params.validate(), Err(ConfigError::EmptyCommittee("shard")));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let params: BeaconParams = toml::from_str(
            r#"
            epoch_length = 20
            swap_boundary = "before_epoch_end"
            "#,
        )
        .unwrap();
        assert_eq!(params.epoch_length, 20);
        assert_eq!(params.swap_boundary, SwapBoundary::BeforeEpochEnd);
        assert_eq!(params.active_shards, BeaconParams::default().active_shards);
    }
}
