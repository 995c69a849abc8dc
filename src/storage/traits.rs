//! Storage Contract Module
//!
//! The trait every durable backend implements, and its error type.

use thiserror::Error;

// == Storage Error ==
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Not supported by this store: {0}")]
    Unsupported(&'static str),
}

// == Persistent Store ==
/// Durable key-value engine sitting behind the eviction layer.
///
/// Implementations must be safe to call from several threads at once.
/// `get`, `set` and `occupied_size` are called without the cache's
/// bookkeeping lock. `delete` is called with that lock held for a whole
/// eviction or bulk-removal batch, so it must not call back into the cache.
pub trait PersistentStore: Send + Sync {
    /// Returns `Ok(None)` when the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Durably writes the value; returns only after the write is committed.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Durably removes the key. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;

    /// Approximate bytes occupied by the persisted data set.
    fn occupied_size(&self) -> Result<u64, StorageError>;

    /// Lists every persisted key. Used to seed the recency index.
    fn keys(&self) -> Result<Vec<Vec<u8>>, StorageError> {
        Err(StorageError::Unsupported("key enumeration"))
    }
}
