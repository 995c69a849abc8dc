//! Disk LRU - size-bounded eviction for persistent key-value stores
//!
//! Tracks access recency in memory and evicts the coldest entries from the
//! backing store once its occupied size passes a configured ceiling.

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;

pub use cache::{CacheStats, LruCache};
pub use config::Config;
pub use error::{BatchFailure, CacheError};
pub use storage::{FileStore, MemoryStore, PersistentStore, StorageError};
