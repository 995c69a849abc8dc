//! Size Monitor Module
//!
//! Decides when a write should be followed by a size check and compares the
//! store's occupied size against the ceiling.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::storage::{PersistentStore, StorageError};

// == Size Monitor ==
/// Samples the backing store's occupied size on a write cadence.
///
/// Sizes come from the store's own file/segment accounting, so they can run
/// ahead of the live data right after writes and lag behind it right after
/// deletes.
#[derive(Debug)]
pub struct SizeMonitor {
    max_size_bytes: u64,
    cadence: u64,
    writes: AtomicU64,
}

impl SizeMonitor {
    /// Creates a monitor; a `cadence` of 0 is treated as 1.
    pub fn new(max_size_bytes: u64, cadence: u64) -> Self {
        Self {
            max_size_bytes,
            cadence: cadence.max(1),
            writes: AtomicU64::new(0),
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Counts a write and reports whether this one is due for a size check.
    pub fn should_sample(&self) -> bool {
        let n = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        n % self.cadence == 0
    }

    /// True when the store occupies strictly more than the ceiling.
    pub fn is_over_ceiling<S: PersistentStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<bool, StorageError> {
        let size = store.occupied_size()?;
        debug!(size, ceiling = self.max_size_bytes, "Sampled store size");
        Ok(size > self.max_size_bytes)
    }
}
