//! Deterministic random oracle.

use crate::ports::RandomOracle;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

/// Seconds per simulated external block.
const EXTERNAL_BLOCK_SECONDS: i64 = 600;

/// Oracle whose nonce for a timestamp is derived from its hash.
///
/// The oracle clock only moves through [`FixedRandomOracle::set_timestamp`],
/// so devnets and tests control when a random number becomes available.
pub struct FixedRandomOracle {
    current: RwLock<i64>,
}

impl FixedRandomOracle {
    pub fn new(timestamp: i64) -> Self {
        Self {
            current: RwLock::new(timestamp),
        }
    }

    pub fn set_timestamp(&self, timestamp: i64) {
        *self.current.write() = timestamp;
    }

    /// Nonce published for `timestamp`.
    pub fn nonce_for(timestamp: i64) -> i64 {
        let digest = Sha256::digest(timestamp.to_le_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        i64::from_le_bytes(bytes) & i64::MAX
    }
}

#[async_trait]
impl RandomOracle for FixedRandomOracle {
    async fn current_timestamp(&self) -> Result<i64, String> {
        Ok(*self.current.read())
    }

    async fn nonce_by_timestamp(&self, timestamp: i64) -> Result<(u64, i64, i64), String> {
        let current = *self.current.read();
        if timestamp > current {
            return Err(format!(
                "no nonce after {timestamp}, oracle is at {current}"
            ));
        }
        let btc_height = (timestamp.max(0) / EXTERNAL_BLOCK_SECONDS) as u64;
        Ok((btc_height, timestamp, Self::nonce_for(timestamp)))
    }

    async fn verify_nonce(&self, timestamp: i64, nonce: i64) -> Result<bool, String> {
        Ok(Self::nonce_for(timestamp) == nonce)
    }
}
