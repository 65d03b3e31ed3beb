//! # Quantum-Chain Beacon Node
//!
//! Devnet entry point for the beacon chain.
//!
//! ## Startup Sequence
//!
//! 1. Install the tracing subscriber (`RUST_LOG` overrides `info`)
//! 2. Load configuration (defaults, `QC_BEACON_CONFIG`, env overrides)
//! 3. Build genesis and wire the in-memory adapters
//! 4. Start the bus logger and the producer loop
//! 5. Run until Ctrl+C

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use node_runtime::{BeaconContainer, DevnetProducer, EventLogHandler, NodeConfig, ShardFeed};
use qc_18_beacon_chain::BeaconChainApi;
use shared_bus::EventFilter;

/// The node runtime driving one devnet producer.
pub struct NodeRuntime {
    container: Arc<BeaconContainer>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl NodeRuntime {
    pub async fn new(config: NodeConfig) -> Result<Self> {
        info!("Creating beacon node runtime");
        let container = Arc::new(BeaconContainer::new(config, unix_now()).await?);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn start(&self) {
        info!("===========================================");
        info!("  Quantum-Chain Beacon Node v0.1.0");
        info!("===========================================");

        let handler =
            EventLogHandler::new(self.container.event_bus.subscribe(EventFilter::all()));
        let mut log_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = handler.run() => {}
                _ = log_shutdown.changed() => {
                    info!("[bus] Shutdown signal received");
                }
            }
        });

        let container = Arc::clone(&self.container);
        let feed = ShardFeed::new(
            Arc::clone(&container.shard_pool),
            &container.config.beacon,
            container.config.devnet.stake_every,
        );
        let mut producer = DevnetProducer::new(
            Arc::clone(&container.service),
            Arc::clone(&container.oracle),
            feed,
        );
        let mut interval = tokio::time::interval(container.config.block_interval());
        let mut producer_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = producer.step(unix_now()).await {
                            if e.kind().is_retryable() {
                                warn!(error = %e, "Block production failed, retrying next slot");
                            } else {
                                error!(error = %e, "Block production failed");
                            }
                        }
                    }
                    _ = producer_shutdown.changed() => {
                        info!("[producer] Shutdown signal received");
                        break;
                    }
                }
            }
        });

        info!(
            interval_ms = self.container.config.devnet.block_interval_ms,
            "Beacon producer running"
        );
    }

    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let best = self.container.service.best_state();
        info!(
            height = best.beacon_height,
            epoch = best.epoch,
            stored_blocks = self.container.storage.block_count(),
            "Shutdown complete"
        );
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::load().context("Failed to load configuration")?;

    let runtime = NodeRuntime::new(config).await?;
    runtime.start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
