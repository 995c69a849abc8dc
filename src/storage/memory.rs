//! Memory Store Module
//!
//! Non-durable store for embedding and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::traits::{PersistentStore, StorageError};

// == Memory Store ==
/// Sorted in-memory store.
///
/// Occupied size is the sum of key and value lengths, which makes eviction
/// thresholds easy to reason about when embedding or testing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current item count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data(&self) -> Result<MutexGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>, StorageError> {
        self.data
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }
}

// == Persistent Store ==
impl PersistentStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data()?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.data()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.data()?.remove(key);
        Ok(())
    }

    fn occupied_size(&self) -> Result<u64, StorageError> {
        Ok(self
            .data()?
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum())
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        Ok(self.data()?.keys().cloned().collect())
    }
}
