//! # Beacon Container
//!
//! Owns the devnet adapters and the beacon chain service built on them.
//!
//! ```text
//! InMemoryShardPool ──┐
//! AcceptAllVerifier ──┤
//! FixedRandomOracle ──┼──→ BeaconChainService ──→ BusEventPublisher ──→ InMemoryEventBus
//! InMemoryBlockStorage┘
//! ```

mod config;

pub use config::*;

use crate::genesis::build_devnet_genesis;
use anyhow::{Context, Result};
use qc_18_beacon_chain::{
    AcceptAllVerifier, BeaconChainDependencies, BeaconChainService, BusEventPublisher,
    FixedRandomOracle, InMemoryBlockStorage, InMemoryShardPool,
};
use shared_bus::InMemoryEventBus;
use std::sync::Arc;
use tracing::info;

/// The service as wired for a devnet.
pub type DevnetService = BeaconChainService<
    InMemoryShardPool,
    AcceptAllVerifier,
    FixedRandomOracle,
    InMemoryBlockStorage,
    BusEventPublisher<InMemoryEventBus>,
>;

pub struct BeaconContainer {
    pub config: NodeConfig,
    pub service: Arc<DevnetService>,
    pub shard_pool: Arc<InMemoryShardPool>,
    pub oracle: Arc<FixedRandomOracle>,
    pub storage: Arc<InMemoryBlockStorage>,
    pub event_bus: Arc<InMemoryEventBus>,
}

impl BeaconContainer {
    /// Build genesis and every adapter, then start the service on top.
    pub async fn new(config: NodeConfig, genesis_timestamp: i64) -> Result<Self> {
        let (genesis, genesis_state) = build_devnet_genesis(&config, genesis_timestamp)?;

        let shard_pool = Arc::new(InMemoryShardPool::new());
        let oracle = Arc::new(FixedRandomOracle::new(genesis_timestamp));
        let storage = Arc::new(InMemoryBlockStorage::new());
        let event_bus = Arc::new(InMemoryEventBus::with_capacity(config.devnet.event_buffer));

        let deps = BeaconChainDependencies {
            shard_pool: Arc::clone(&shard_pool),
            sig_verifier: Arc::new(AcceptAllVerifier),
            random_oracle: Arc::clone(&oracle),
            storage: Arc::clone(&storage),
            event_bus: Arc::new(BusEventPublisher::new(Arc::clone(&event_bus))),
        };
        let service = BeaconChainService::with_genesis(deps, genesis, genesis_state)
            .await
            .context("Failed to start beacon chain service")?;

        info!(
            shards = config.beacon.active_shards,
            epoch_length = config.beacon.epoch_length,
            beacon_validators = config.beacon_validators(),
            "Beacon container initialized"
        );

        Ok(Self {
            config,
            service: Arc::new(service),
            shard_pool,
            oracle,
            storage,
            event_bus,
        })
    }
}
