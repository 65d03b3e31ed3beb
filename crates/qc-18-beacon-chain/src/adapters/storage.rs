//! In-memory block storage.

use crate::ports::BlockStorage;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::Hash;
use std::collections::{BTreeMap, HashMap};

/// Encoded blocks keyed by hash, with a height index.
#[derive(Default)]
pub struct InMemoryBlockStorage {
    blocks: RwLock<HashMap<Hash, Vec<u8>>>,
    by_height: RwLock<BTreeMap<u64, Hash>>,
    best_state: RwLock<Option<Vec<u8>>>,
}

impl InMemoryBlockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn hash_at_height(&self, height: u64) -> Option<Hash> {
        self.by_height.read().get(&height).copied()
    }

    /// Last encoded best state written.
    pub fn latest_best_state(&self) -> Option<Vec<u8>> {
        self.best_state.read().clone()
    }
}

#[async_trait]
impl BlockStorage for InMemoryBlockStorage {
    async fn fetch_block_by_hash(&self, hash: &Hash) -> Result<Option<Vec<u8>>, String> {
        Ok(self.blocks.read().get(hash).cloned())
    }

    async fn has_block(&self, hash: &Hash) -> Result<bool, String> {
        Ok(self.blocks.read().contains_key(hash))
    }

    async fn block_hash_at_height(&self, height: u64) -> Result<Option<Hash>, String> {
        Ok(self.hash_at_height(height))
    }

    async fn store_block(&self, hash: Hash, height: u64, encoded: Vec<u8>) -> Result<(), String> {
        self.blocks.write().insert(hash, encoded);
        self.by_height.write().insert(height, hash);
        Ok(())
    }

    async fn store_best_state(&self, encoded: Vec<u8>) -> Result<(), String> {
        *self.best_state.write() = Some(encoded);
        Ok(())
    }
}
