//! Eviction Engine Module
//!
//! Stage-then-delete removal of keys from both the recency index and the
//! backing store, shared by size-triggered eviction and bulk removal.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::cache::recency::{RecencyIndex, Slot};
use crate::error::{display_key, BatchFailure};
use crate::storage::{PersistentStore, StorageError};

// == Batch Outcome ==
/// Result of one stage-then-delete pass.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Keys deleted from the store and dropped from the index
    pub removed: Vec<Vec<u8>>,
    /// Keys whose delete failed; still tracked and still persisted
    pub failed: Vec<(Vec<u8>, StorageError)>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Splits into the removed count, or a failure report when any delete
    /// failed.
    pub fn into_result(self) -> Result<usize, BatchFailure> {
        if self.failed.is_empty() {
            Ok(self.removed.len())
        } else {
            Err(BatchFailure {
                removed: self.removed.len(),
                failed: self.failed,
            })
        }
    }
}

// == Staging ==
/// Walks the recency list from the back and collects up to `batch` keys.
///
/// `protect` is skipped wherever it sits; the list is not modified.
pub fn stage_coldest(index: &RecencyIndex, batch: usize, protect: Option<&[u8]>) -> Vec<Vec<u8>> {
    index
        .iter_coldest()
        .filter(|key| Some(*key) != protect)
        .take(batch)
        .map(<[u8]>::to_vec)
        .collect()
}

// == Delete Staged ==
/// Removes staged keys from the index and the store.
///
/// Index entries are detached first, then each key is deleted from the
/// store. A failed delete reattaches its index entry in place, so the key
/// stays exactly where it was in recency order. Nodes of successfully
/// deleted keys are unlinked last.
///
/// Keys not tracked by the index are still deleted from the store.
/// Duplicate keys are processed once.
pub fn delete_staged<S: PersistentStore + ?Sized>(
    index: &mut RecencyIndex,
    store: &S,
    staged: Vec<Vec<u8>>,
) -> BatchOutcome {
    let mut seen = HashSet::with_capacity(staged.len());
    let detached: Vec<(Vec<u8>, Option<Slot>)> = staged
        .into_iter()
        .filter(|key| seen.insert(key.clone()))
        .map(|key| {
            let slot = index.detach(&key);
            (key, slot)
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    let mut to_unlink = Vec::with_capacity(detached.len());

    for (key, slot) in detached {
        match store.delete(&key) {
            Ok(()) => {
                if let Some(slot) = slot {
                    to_unlink.push(slot);
                }
                outcome.removed.push(key);
            }
            Err(err) => {
                warn!(key = %display_key(&key), error = %err, "Delete failed, keeping key tracked");
                if let Some(slot) = slot {
                    index.reattach(slot);
                }
                outcome.failed.push((key, err));
            }
        }
    }

    for slot in to_unlink {
        index.unlink(slot);
    }

    debug!(
        removed = outcome.removed.len(),
        failed = outcome.failed.len(),
        "Batch delete finished"
    );
    outcome
}

// == Evict ==
/// Removes the `batch` coldest keys, skipping `protect`.
///
/// Does not re-check the store size afterwards.
pub fn evict<S: PersistentStore + ?Sized>(
    index: &mut RecencyIndex,
    store: &S,
    batch: usize,
    protect: Option<&[u8]>,
) -> BatchOutcome {
    let staged = stage_coldest(index, batch, protect);
    delete_staged(index, store, staged)
}
