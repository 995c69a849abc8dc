//! Cache Facade Module
//!
//! Public get/set surface coordinating the recency index, size monitor and
//! eviction engine over a persistent store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::cache::eviction;
use crate::cache::{CacheStats, RecencyIndex, SizeMonitor};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::{FileStore, PersistentStore, StorageError};

/// In-memory state guarded by the bookkeeping lock.
#[derive(Debug, Default)]
struct Bookkeeping {
    index: RecencyIndex,
    stats: CacheStats,
}

impl Bookkeeping {
    fn sync_total(&mut self) {
        let len = self.index.len();
        self.stats.set_total_entries(len);
    }
}

// == LRU Cache ==
/// Size-bounded LRU front for a persistent store.
///
/// Every successful `get` and every `set` moves the key to the front of the
/// recency list. When a sampled size check finds the store above
/// `max_size_bytes`, the `eviction_batch_size` coldest keys are deleted
/// before the write proceeds.
///
/// The key being written is never its own victim: staging skips it, so a
/// trigger removes `min(eviction_batch_size, tracked - 1)` keys when that
/// key is already tracked, and up to `eviction_batch_size` otherwise.
///
/// # Consistency
/// The bookkeeping lock covers index updates only; store reads, writes and
/// size checks run outside it. A concurrent observer can therefore see a
/// key at the front of the recency list before its value is durable, or a
/// durable value whose touch has not landed yet. Eviction and `remove_many`
/// keep the lock for their whole batch, so a key cannot be touched between
/// being staged and being deleted.
///
/// Only keys that pass through this cache (or are seeded via `reconcile`)
/// are eviction candidates.
#[derive(Debug)]
pub struct LruCache<S> {
    store: S,
    config: Config,
    monitor: SizeMonitor,
    state: Mutex<Bookkeeping>,
}

impl LruCache<FileStore> {
    /// Opens a file-backed cache at `config.storage_location`.
    pub fn open(config: Config) -> Result<Self> {
        let store = FileStore::open(&config.storage_location)?;
        Self::new(config, store)
    }
}

impl<S: PersistentStore> LruCache<S> {
    // == Constructor ==
    /// Wraps `store` with eviction bookkeeping.
    ///
    /// Starts with an empty recency index; call `reconcile` to pick up keys
    /// already in the store.
    pub fn new(config: Config, store: S) -> Result<Self> {
        config.validate()?;
        let monitor = SizeMonitor::new(config.max_size_bytes, config.size_check_cadence);
        Ok(Self {
            store,
            config,
            monitor,
            state: Mutex::new(Bookkeeping::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, Bookkeeping> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Reads a value and marks the key as recently used.
    ///
    /// A missing key returns `NotFound` and leaves the recency order alone.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let value = self.store.get(key)?;
        let mut state = self.state();
        match value {
            Some(value) => {
                state.index.touch(key);
                state.stats.record_hit();
                state.sync_total();
                Ok(value)
            }
            None => {
                state.stats.record_miss();
                Err(CacheError::NotFound(key.to_vec()))
            }
        }
    }

    // == Set ==
    /// Marks the key as recently used, evicts if the store is over its
    /// ceiling, then durably writes the value.
    ///
    /// The key is touched before the write outcome is known. If eviction
    /// reports failures the write is not attempted and `EvictionFailure` is
    /// returned; keys whose delete failed stay tracked and persisted.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        {
            let mut state = self.state();
            state.index.touch(key);
            state.sync_total();
        }

        if self.monitor.should_sample() && self.monitor.is_over_ceiling(&self.store)? {
            self.evict_for(key)?;
        }

        self.store.set(key, value)?;
        Ok(())
    }

    /// Runs one eviction pass, never selecting `writing`.
    fn evict_for(&self, writing: &[u8]) -> Result<()> {
        let mut state = self.state();
        let outcome = eviction::evict(
            &mut state.index,
            &self.store,
            self.config.eviction_batch_size,
            Some(writing),
        );
        state
            .stats
            .record_eviction_cycle(outcome.removed.len(), outcome.failed.len());
        state.sync_total();
        drop(state);

        info!(
            evicted = outcome.removed.len(),
            failed = outcome.failed.len(),
            batch = self.config.eviction_batch_size,
            "Eviction cycle finished"
        );
        outcome
            .into_result()
            .map(|_| ())
            .map_err(CacheError::EvictionFailure)
    }

    // == Remove Many ==
    /// Deletes the given keys from the store and stops tracking them.
    ///
    /// Keys that were never tracked are still deleted from the store. Keys
    /// whose delete fails stay tracked in place and are reported through
    /// `RemovalFailure`. Returns the number of keys removed.
    pub fn remove_many<I, K>(&self, keys: I) -> Result<usize>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let staged: Vec<Vec<u8>> = keys.into_iter().map(|k| k.as_ref().to_vec()).collect();
        if staged.is_empty() {
            return Ok(0);
        }

        let mut state = self.state();
        let outcome = eviction::delete_staged(&mut state.index, &self.store, staged);
        state
            .stats
            .record_removal(outcome.removed.len(), outcome.failed.len());
        state.sync_total();
        drop(state);

        debug!(
            removed = outcome.removed.len(),
            failed = outcome.failed.len(),
            "Bulk removal finished"
        );
        outcome.into_result().map_err(CacheError::RemovalFailure)
    }

    // == Reconcile ==
    /// Starts tracking keys that exist in the store but were never touched
    /// through this cache, placing them behind all tracked keys.
    ///
    /// Returns the number of newly tracked keys. Stores that cannot list
    /// their keys yield `UnsupportedOperation`.
    pub fn reconcile(&self) -> Result<usize> {
        let keys = self.store.keys().map_err(|err| match err {
            StorageError::Unsupported(what) => CacheError::UnsupportedOperation(what),
            other => CacheError::StoreIo(other),
        })?;

        let mut state = self.state();
        let mut seeded = 0;
        for key in &keys {
            if state.index.push_back(key) {
                seeded += 1;
            }
        }
        state.sync_total();
        drop(state);

        info!(seeded, listed = keys.len(), "Reconciled recency index with store");
        Ok(seeded)
    }

    // == Introspection ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.state().stats.clone()
    }

    /// Number of keys currently eligible for eviction.
    pub fn tracked_len(&self) -> usize {
        self.state().index.len()
    }

    pub fn is_tracked(&self, key: &[u8]) -> bool {
        self.state().index.contains(key)
    }

    /// Tracked keys from most to least recently used.
    pub fn recency_order(&self) -> Vec<Vec<u8>> {
        self.state().index.iter().map(<[u8]>::to_vec).collect()
    }

    /// Current size reported by the store.
    pub fn occupied_size(&self) -> Result<u64> {
        Ok(self.store.occupied_size()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The wrapped store. Writing through it bypasses recency tracking.
    pub fn store(&self) -> &S {
        &self.store
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::FlakyStore;
    use crate::storage::MemoryStore;

    /// 29-byte value; with a one-byte key each entry occupies 30 bytes.
    const VALUE: &[u8] = &[b'x'; 29];

    fn cache(max_size_bytes: u64, batch: usize) -> LruCache<MemoryStore> {
        LruCache::new(Config::new(max_size_bytes, batch), MemoryStore::new()).unwrap()
    }

    fn keys(cache: &LruCache<impl PersistentStore>) -> Vec<String> {
        cache
            .recency_order()
            .into_iter()
            .map(|k| String::from_utf8(k).unwrap())
            .collect()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = LruCache::new(Config::new(100, 0), MemoryStore::new());
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_set_and_get() {
        let cache = cache(1000, 2);

        cache.set(b"key1", b"value1").unwrap();

        assert_eq!(cache.get(b"key1").unwrap(), b"value1".to_vec());
        assert_eq!(cache.tracked_len(), 1);
    }

    #[test]
    fn test_get_nonexistent_leaves_order() {
        let cache = cache(1000, 2);
        cache.set(b"a", b"1").unwrap();
        cache.set(b"b", b"2").unwrap();

        let result = cache.get(b"missing");

        assert!(matches!(result, Err(CacheError::NotFound(k)) if k == b"missing"));
        assert_eq!(keys(&cache), vec!["b", "a"]);
        assert!(!cache.is_tracked(b"missing"));
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_get_untracked_persisted_key_starts_tracking() {
        let cache = cache(1000, 2);
        cache.store().set(b"direct", b"v").unwrap();
        assert!(!cache.is_tracked(b"direct"));

        assert_eq!(cache.get(b"direct").unwrap(), b"v".to_vec());
        assert!(cache.is_tracked(b"direct"));
    }

    #[test]
    fn test_overwrite() {
        let cache = cache(1000, 2);

        cache.set(b"key1", b"value1").unwrap();
        cache.set(b"key1", b"value2").unwrap();

        assert_eq!(cache.get(b"key1").unwrap(), b"value2".to_vec());
        assert_eq!(cache.tracked_len(), 1);
    }

    #[test]
    fn test_touch_order_on_get_and_set() {
        let cache = cache(1000, 2);
        for key in [b"a", b"b", b"c"] {
            cache.set(key, b"v").unwrap();
        }
        cache.get(b"a").unwrap();
        cache.set(b"b", b"w").unwrap();

        assert_eq!(keys(&cache), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_eviction_removes_two_coldest() {
        let cache = cache(100, 2);
        for key in [b"a", b"b", b"c", b"d", b"e"] {
            cache.set(key, VALUE).unwrap();
        }

        assert!(matches!(cache.get(b"a"), Err(CacheError::NotFound(_))));
        assert!(matches!(cache.get(b"b"), Err(CacheError::NotFound(_))));
        for key in [b"c", b"d", b"e"] {
            assert_eq!(cache.get(key).unwrap(), VALUE.to_vec());
        }

        let stats = cache.stats();
        assert_eq!(stats.eviction_cycles, 1);
        assert_eq!(stats.evictions, 2);
        assert!(stats.last_eviction_at.is_some());
    }

    #[test]
    fn test_get_keeps_key_hot_across_eviction() {
        let cache = cache(100, 2);
        cache.set(b"a", VALUE).unwrap();
        for key in [b"b", b"c", b"d", b"e"] {
            cache.get(b"a").unwrap();
            cache.set(key, VALUE).unwrap();
        }

        assert_eq!(cache.get(b"a").unwrap(), VALUE.to_vec());
        assert!(matches!(cache.get(b"b"), Err(CacheError::NotFound(_))));
        assert!(matches!(cache.get(b"c"), Err(CacheError::NotFound(_))));
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_no_eviction_at_ceiling() {
        let cache = cache(90, 1);
        for key in [b"a", b"b", b"c"] {
            cache.set(key, VALUE).unwrap();
        }
        // Store is exactly at the ceiling; next write must not evict
        cache.set(b"d", VALUE).unwrap();

        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.tracked_len(), 4);
    }

    #[test]
    fn test_writing_key_is_never_its_own_victim() {
        let cache = cache(10, 5);
        cache.set(b"a", VALUE).unwrap();
        cache.set(b"b", VALUE).unwrap();

        // Only "a" was eligible; "b" survives its own trigger
        assert_eq!(cache.get(b"b").unwrap(), VALUE.to_vec());
        assert!(matches!(cache.get(b"a"), Err(CacheError::NotFound(_))));
        assert_eq!(keys(&cache), vec!["b"]);
    }

    #[test]
    fn test_trigger_removes_at_most_tracked_minus_one() {
        let cache = cache(50, 5);
        cache.set(b"a", VALUE).unwrap();
        cache.set(b"b", VALUE).unwrap();
        cache.set(b"c", VALUE).unwrap(); // store at 60, three keys tracked

        // batch of 5 but only "a" and "b" are eligible
        assert_eq!(cache.stats().evictions, 2);
        assert_eq!(cache.stats().eviction_cycles, 1);
        assert_eq!(keys(&cache), vec!["c"]);
        assert_eq!(cache.get(b"c").unwrap(), VALUE.to_vec());
    }

    #[test]
    fn test_cadence_defers_size_checks() {
        let config = Config::new(50, 1).with_size_check_cadence(3);
        let cache = LruCache::new(config, MemoryStore::new()).unwrap();

        cache.set(b"a", VALUE).unwrap(); // write 1, no check
        cache.set(b"b", VALUE).unwrap(); // write 2, no check (store at 60)
        assert_eq!(cache.stats().evictions, 0);

        cache.set(b"c", VALUE).unwrap(); // write 3, checks and evicts "a"
        assert_eq!(cache.stats().evictions, 1);
        assert!(!cache.is_tracked(b"a"));
    }

    #[test]
    fn test_eviction_failure_rolls_back_and_skips_write() {
        let store = FlakyStore::wrap(MemoryStore::new());
        store.break_deletes_for(b"a");
        let cache = LruCache::new(Config::new(100, 2), store).unwrap();

        for key in [b"a", b"b", b"c", b"d"] {
            cache.set(key, VALUE).unwrap();
        }
        let result = cache.set(b"e", VALUE);

        match result {
            Err(CacheError::EvictionFailure(failure)) => {
                assert_eq!(failure.removed, 1);
                assert_eq!(failure.failed_keys().collect::<Vec<_>>(), vec![&b"a"[..]]);
            }
            other => panic!("expected EvictionFailure, got {:?}", other),
        }

        // a: still tracked and persisted; b: gone from both
        assert!(cache.is_tracked(b"a"));
        assert!(cache.store().get(b"a").unwrap().is_some());
        assert!(!cache.is_tracked(b"b"));
        assert!(cache.store().get(b"b").unwrap().is_none());
        // e was touched but its write was not attempted
        assert!(cache.store().get(b"e").unwrap().is_none());
        assert_eq!(cache.stats().failed_deletions, 1);

        // Retrying once the store recovers succeeds
        cache.store().heal();
        cache.set(b"e", VALUE).unwrap();
        assert_eq!(cache.get(b"e").unwrap(), VALUE.to_vec());
    }

    #[test]
    fn test_remove_many() {
        let cache = cache(1000, 2);
        for key in [b"a", b"b", b"c"] {
            cache.set(key, b"v").unwrap();
        }
        cache.store().set(b"untracked", b"v").unwrap();

        let removed = cache
            .remove_many(["a", "c", "untracked", "never-existed"].map(str::as_bytes))
            .unwrap();

        assert_eq!(removed, 4);
        assert_eq!(keys(&cache), vec!["b"]);
        assert!(cache.store().get(b"untracked").unwrap().is_none());
        assert_eq!(cache.stats().removals, 4);
    }

    #[test]
    fn test_remove_many_empty_is_noop() {
        let cache = cache(1000, 2);
        cache.set(b"a", b"v").unwrap();
        assert_eq!(cache.remove_many(Vec::<Vec<u8>>::new()).unwrap(), 0);
        assert_eq!(cache.tracked_len(), 1);
    }

    #[test]
    fn test_remove_many_partial_failure() {
        let store = FlakyStore::wrap(MemoryStore::new());
        let cache = LruCache::new(Config::new(1000, 2), store).unwrap();
        for key in [b"a", b"b", b"c"] {
            cache.set(key, b"v").unwrap();
        }
        cache.store().break_deletes_for(b"b");

        let result = cache.remove_many(vec![b"a".to_vec(), b"b".to_vec()]);

        assert!(matches!(result, Err(CacheError::RemovalFailure(ref f)) if f.removed == 1));
        assert_eq!(keys(&cache), vec!["c", "b"]);
        assert!(cache.store().get(b"b").unwrap().is_some());
    }

    #[test]
    fn test_reconcile_seeds_untracked_as_coldest() {
        let cache = cache(1000, 2);
        cache.store().set(b"old1", b"v").unwrap();
        cache.store().set(b"old2", b"v").unwrap();
        cache.set(b"fresh", b"v").unwrap();

        assert_eq!(cache.reconcile().unwrap(), 2);
        assert_eq!(keys(&cache), vec!["fresh", "old1", "old2"]);

        // Second pass finds nothing new
        assert_eq!(cache.reconcile().unwrap(), 0);
        assert_eq!(cache.stats().total_entries, 3);
    }

    #[test]
    fn test_reconcile_unsupported_store() {
        struct Opaque(MemoryStore);
        impl PersistentStore for Opaque {
            fn get(&self, key: &[u8]) -> std::result::Result<Option<Vec<u8>>, StorageError> {
                self.0.get(key)
            }
            fn set(&self, key: &[u8], value: &[u8]) -> std::result::Result<(), StorageError> {
                self.0.set(key, value)
            }
            fn delete(&self, key: &[u8]) -> std::result::Result<(), StorageError> {
                self.0.delete(key)
            }
            fn occupied_size(&self) -> std::result::Result<u64, StorageError> {
                self.0.occupied_size()
            }
        }

        let cache = LruCache::new(Config::new(1000, 2), Opaque(MemoryStore::new())).unwrap();
        assert!(matches!(
            cache.reconcile(),
            Err(CacheError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_concurrent_access_keeps_index_consistent() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(cache(100_000, 8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("t{}-{}", t, i % 10);
                        cache.set(key.as_bytes(), b"value").unwrap();
                        let _ = cache.get(key.as_bytes());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker should not panic");
        }

        let order = cache.recency_order();
        let unique: std::collections::HashSet<_> = order.iter().collect();
        assert_eq!(order.len(), 40);
        assert_eq!(unique.len(), 40);
        assert_eq!(cache.stats().total_entries, 40);
    }
}
