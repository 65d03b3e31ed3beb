//! # Beacon Chain Metrics
//!
//! Prometheus metrics for the validation pipeline.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-beacon-chain = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `beacon_blocks_inserted_total` - Counter of committed blocks
//! - `beacon_blocks_rejected_total` - Counter of rejected blocks (by error kind)
//! - `beacon_instructions_dropped_total` - Counter of malformed instructions dropped
//! - `beacon_pipeline_latency_seconds` - Histogram of insert pipeline times

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total blocks committed
    pub static ref BLOCKS_INSERTED: IntCounter = register_int_counter!(
        "beacon_blocks_inserted_total",
        "Total number of beacon blocks committed"
    )
    .expect("Failed to create BLOCKS_INSERTED metric");

    /// Total blocks rejected, labeled by error kind
    pub static ref BLOCKS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "beacon_blocks_rejected_total",
        "Total number of beacon blocks rejected",
        &["kind"]
    )
    .expect("Failed to create BLOCKS_REJECTED metric");

    /// Malformed instructions dropped during transition
    pub static ref INSTRUCTIONS_DROPPED: IntCounterVec = register_int_counter_vec!(
        "beacon_instructions_dropped_total",
        "Total number of malformed instructions dropped",
        &["reason"]
    )
    .expect("Failed to create INSTRUCTIONS_DROPPED metric");

    /// Histogram of insert pipeline latency
    pub static ref PIPELINE_LATENCY: Histogram = register_histogram!(
        "beacon_pipeline_latency_seconds",
        "Time taken to validate and commit a beacon block in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to create PIPELINE_LATENCY metric");
}

#[cfg(feature = "metrics")]
pub fn record_block_inserted() {
    BLOCKS_INSERTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_block_rejected(kind: &str) {
    BLOCKS_REJECTED.with_label_values(&[kind]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_instruction_dropped(reason: &str) {
    INSTRUCTIONS_DROPPED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_pipeline_latency(seconds: f64) {
    PIPELINE_LATENCY.observe(seconds);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_block_inserted() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_rejected(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_instruction_dropped(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_pipeline_latency(_seconds: f64) {}
