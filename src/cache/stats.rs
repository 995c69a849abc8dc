//! Cache Statistics Module
//!
//! Tracks hits, misses and eviction activity.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Stats ==
/// Tracks cache activity counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of gets that found the key in the store
    pub hits: u64,
    /// Number of gets that did not
    pub misses: u64,
    /// Number of entries evicted by the size ceiling
    pub evictions: u64,
    /// Number of eviction passes triggered
    pub eviction_cycles: u64,
    /// Number of entries removed through bulk removal
    pub removals: u64,
    /// Deletes that failed during eviction or bulk removal
    pub failed_deletions: u64,
    /// Current number of tracked keys
    pub total_entries: usize,
    /// When the last eviction pass ran
    pub last_eviction_at: Option<DateTime<Utc>>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no gets have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction Cycle ==
    /// Records one eviction pass and its per-key results.
    pub fn record_eviction_cycle(&mut self, evicted: usize, failed: usize) {
        self.eviction_cycles += 1;
        self.evictions += evicted as u64;
        self.failed_deletions += failed as u64;
        self.last_eviction_at = Some(Utc::now());
    }

    /// Records a bulk removal.
    pub fn record_removal(&mut self, removed: usize, failed: usize) {
        self.removals += removed as u64;
        self.failed_deletions += failed as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
