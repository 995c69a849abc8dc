//! Error types for the eviction layer
//!
//! Provides unified error handling using thiserror.

use std::fmt;

use thiserror::Error;

use crate::storage::StorageError;

// == Batch Failure ==
/// Outcome of a stage-then-delete batch where at least one delete failed.
///
/// Keys listed in `failed` are still present in both the recency index and
/// the backing store.
#[derive(Debug)]
pub struct BatchFailure {
    /// Number of keys successfully removed before the error was reported
    pub removed: usize,
    /// Keys whose delete failed, paired with the store error
    pub failed: Vec<(Vec<u8>, StorageError)>,
}

impl BatchFailure {
    /// Keys that could not be deleted.
    pub fn failed_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.failed.iter().map(|(key, _)| key.as_slice())
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} removed, {} failed",
            self.removed,
            self.failed.len()
        )?;
        if let Some((key, err)) = self.failed.first() {
            write!(f, " (first: {}: {})", display_key(key), err)?;
        }
        Ok(())
    }
}

// == Cache Error Enum ==
/// Unified error type for the eviction layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present in the backing store
    #[error("Key not found: {}", display_key(.0))]
    NotFound(Vec<u8>),

    /// Backing store reported a failure on get/set/size
    #[error("Store I/O error: {0}")]
    StoreIo(#[from] StorageError),

    /// One or more deletes failed during an eviction batch
    #[error("Eviction failed: {0}")]
    EvictionFailure(BatchFailure),

    /// One or more deletes failed during a bulk removal
    #[error("Removal failed: {0}")]
    RemovalFailure(BatchFailure),

    /// Operation not supported by the backing store
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the eviction layer.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Renders a byte key for messages; non-UTF-8 bytes are replaced.
pub(crate) fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
