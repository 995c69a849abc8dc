//! Cache Module
//!
//! Recency tracking, size sampling and batch eviction in front of a
//! persistent store.

mod eviction;
mod facade;
mod monitor;
mod recency;
mod stats;

#[cfg(test)]
mod test_support;

// Re-export public types
pub use eviction::BatchOutcome;
pub use facade::LruCache;
pub use monitor::SizeMonitor;
pub use recency::RecencyIndex;
pub use stats::CacheStats;
