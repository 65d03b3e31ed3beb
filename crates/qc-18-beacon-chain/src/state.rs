use crate::domain::BeaconBestState;
use parking_lot::RwLock;
use shared_types::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mutable state of the beacon chain service.
///
/// Readers clone the inner `Arc` and validate against that snapshot without
/// holding any lock. Writers serialize on `insert_lock` and replace the
/// snapshot wholesale once a block is committed.
pub struct ChainState {
    best: RwLock<Arc<BeaconBestState>>,
    pub insert_lock: Mutex<()>,
}

impl ChainState {
    pub fn new(best: BeaconBestState) -> Self {
        Self {
            best: RwLock::new(Arc::new(best)),
            insert_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<BeaconBestState> {
        self.best.read().clone()
    }

    pub fn best_block_hash(&self) -> Hash {
        self.best.read().best_block_hash
    }

    pub fn replace(&self, next: BeaconBestState) {
        *self.best.write() = Arc::new(next);
    }
}
