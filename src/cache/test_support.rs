//! Shared fixtures for cache unit tests.

use std::sync::Mutex;

use crate::storage::{MemoryStore, PersistentStore, StorageError};

/// MemoryStore wrapper whose deletes fail for a configurable set of keys.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    broken: Mutex<Vec<Vec<u8>>>,
}

impl FlakyStore {
    pub fn wrap(inner: MemoryStore) -> Self {
        Self {
            inner,
            broken: Mutex::default(),
        }
    }

    pub fn break_deletes_for(&self, key: &[u8]) {
        self.broken.lock().unwrap().push(key.to_vec());
    }

    pub fn heal(&self) {
        self.broken.lock().unwrap().clear();
    }
}

impl PersistentStore for FlakyStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        if self.broken.lock().unwrap().iter().any(|k| k == key) {
            return Err(StorageError::Backend("injected delete failure".to_string()));
        }
        self.inner.delete(key)
    }

    fn occupied_size(&self) -> Result<u64, StorageError> {
        self.inner.occupied_size()
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        self.inner.keys()
    }
}
