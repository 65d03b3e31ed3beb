//! # Node Configuration
//!
//! Beacon network parameters plus devnet runtime knobs.
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults (`BeaconParams::for_testing()`)
//! 2. TOML file named by `QC_BEACON_CONFIG`
//! 3. `QC_EPOCH_LENGTH`, `QC_ACTIVE_SHARDS`, `QC_BLOCK_INTERVAL_MS`

use anyhow::{Context, Result};
use qc_18_beacon_chain::BeaconParams;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "QC_BEACON_CONFIG";
pub const EPOCH_LENGTH_VAR: &str = "QC_EPOCH_LENGTH";
pub const ACTIVE_SHARDS_VAR: &str = "QC_ACTIVE_SHARDS";
pub const BLOCK_INTERVAL_VAR: &str = "QC_BLOCK_INTERVAL_MS";

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub beacon: BeaconParams,
    pub devnet: DevnetConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            beacon: BeaconParams::for_testing(),
            devnet: DevnetConfig::default(),
        }
    }
}

/// Local single-producer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DevnetConfig {
    pub block_interval_ms: u64,
    /// Genesis beacon committee size; 0 means the minimum size.
    pub beacon_validators: usize,
    /// A synthetic staker joins every this many beacon blocks; 0 disables.
    pub stake_every: u64,
    /// Broadcast buffer of the event bus.
    pub event_buffer: usize,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            block_interval_ms: 1000,
            beacon_validators: 0,
            stake_every: 3,
            event_buffer: 1024,
        }
    }
}

impl NodeConfig {
    /// Defaults, then the file named by `QC_BEACON_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from `lookup`, usually the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(EPOCH_LENGTH_VAR) {
            self.beacon.epoch_length = parse_var(EPOCH_LENGTH_VAR, &value)?;
            // Keep the random time inside the new epoch.
            if self.beacon.random_time >= self.beacon.epoch_length {
                self.beacon.random_time = self.beacon.epoch_length / 2;
            }
        }
        if let Some(value) = lookup(ACTIVE_SHARDS_VAR) {
            self.beacon.active_shards = parse_var(ACTIVE_SHARDS_VAR, &value)?;
        }
        if let Some(value) = lookup(BLOCK_INTERVAL_VAR) {
            self.devnet.block_interval_ms = parse_var(BLOCK_INTERVAL_VAR, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.beacon
            .validate()
            .context("Invalid beacon parameters")?;
        if self.devnet.block_interval_ms == 0 {
            anyhow::bail!("block_interval_ms must be positive");
        }
        let validators = self.beacon_validators();
        if validators < self.beacon.min_beacon_committee_size
            || validators > self.beacon.max_beacon_committee_size
        {
            anyhow::bail!(
                "beacon_validators {} outside committee bounds {}..={}",
                validators,
                self.beacon.min_beacon_committee_size,
                self.beacon.max_beacon_committee_size
            );
        }
        Ok(())
    }

    pub fn beacon_validators(&self) -> usize {
        if self.devnet.beacon_validators == 0 {
            self.beacon.min_beacon_committee_size
        } else {
            self.devnet.beacon_validators
        }
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.devnet.block_interval_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{name} has an invalid value {value:?}"))
}
