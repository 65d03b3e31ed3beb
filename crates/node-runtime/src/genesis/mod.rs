//! Devnet genesis.
//!
//! Every key on a devnet is held by this node, so keys are plain labels.

use crate::container::NodeConfig;
use anyhow::{Context, Result};
use qc_18_beacon_chain::{BeaconBestState, BeaconBlock, GenesisBuilder};
use shared_types::CommitteeKey;

pub fn devnet_keys(prefix: &str, count: usize) -> Vec<CommitteeKey> {
    (0..count)
        .map(|i| CommitteeKey::new(format!("{prefix}-{i}")))
        .collect()
}

pub fn build_devnet_genesis(
    config: &NodeConfig,
    timestamp: i64,
) -> Result<(BeaconBlock, BeaconBestState)> {
    let params = &config.beacon;
    let shard_keys = params.active_shards as usize * params.min_shard_committee_size;

    GenesisBuilder::new(params.clone())
        .beacon_keys(devnet_keys("devnet-beacon", config.beacon_validators()))
        .shard_keys(devnet_keys("devnet-shard", shard_keys))
        .timestamp(timestamp)
        .auto_stake(true)
        .build()
        .context("Failed to build genesis block")
}
