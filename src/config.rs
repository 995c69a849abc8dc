//! Configuration Module
//!
//! Handles loading and validating eviction settings from environment variables.

use std::env;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{CacheError, Result};

/// Eviction configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Occupied-size ceiling in bytes; eviction runs when the store exceeds it
    pub max_size_bytes: u64,
    /// Number of coldest entries removed per eviction cycle
    pub eviction_batch_size: usize,
    /// Location handed to the backing store
    pub storage_location: PathBuf,
    /// Check the store size every Nth write (1 = every write)
    pub size_check_cadence: u64,
}

impl Config {
    /// Creates a config with the given ceiling and batch size, leaving the
    /// remaining fields at their defaults.
    pub fn new(max_size_bytes: u64, eviction_batch_size: usize) -> Self {
        Self {
            max_size_bytes,
            eviction_batch_size,
            ..Self::default()
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_SIZE_BYTES` - Size ceiling in bytes (default: 8000000)
    /// - `EVICTION_BATCH_SIZE` - Entries evicted per cycle (default: 1000)
    /// - `STORAGE_LOCATION` - Store directory (default: ./tmp/disk_lru)
    /// - `SIZE_CHECK_CADENCE` - Writes between size checks (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size_bytes: env::var("MAX_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_size_bytes),
            eviction_batch_size: env::var("EVICTION_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.eviction_batch_size),
            storage_location: env::var("STORAGE_LOCATION")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_location),
            size_check_cadence: env::var("SIZE_CHECK_CADENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.size_check_cadence),
        }
    }

    /// Sets the storage location.
    pub fn with_storage_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.storage_location = location.into();
        self
    }

    /// Sets how many writes pass between size checks.
    pub fn with_size_check_cadence(mut self, cadence: u64) -> Self {
        self.size_check_cadence = cadence;
        self
    }

    /// Rejects values the eviction engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.eviction_batch_size == 0 {
            return Err(CacheError::InvalidConfig(
                "eviction_batch_size must be at least 1".to_string(),
            ));
        }
        if self.size_check_cadence == 0 {
            return Err(CacheError::InvalidConfig(
                "size_check_cadence must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size_bytes: 8_000_000,
            eviction_batch_size: 1000,
            storage_location: PathBuf::from("./tmp/disk_lru"),
            size_check_cadence: 1,
        }
    }
}
