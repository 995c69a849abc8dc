//! Disk LRU - size-bounded eviction for persistent key-value stores
//!
//! Runs a write workload against a file-backed store and reports cache
//! statistics, which is handy for tuning the ceiling, batch size and
//! size-check cadence together.

use std::env;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use disk_lru::{Config, LruCache};

/// Main entry point for the workload runner.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file store and seed the index with existing keys
/// 4. Write `WORKLOAD_ENTRIES` values of `WORKLOAD_VALUE_BYTES` each
/// 5. Read back the most recent entries and print statistics as JSON
fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "disk_lru=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Configuration loaded: {}", serde_json::to_string(&config)?);

    let entries: usize = env_or("WORKLOAD_ENTRIES", 10_000);
    let value_bytes: usize = env_or("WORKLOAD_VALUE_BYTES", 1024);

    let cache = LruCache::open(config).context("failed to open cache")?;
    let seeded = cache.reconcile().context("failed to reconcile existing keys")?;
    info!("Store opened, {} existing keys tracked", seeded);

    for i in 0..entries {
        let key = i.to_string();
        let value = filler(i, value_bytes);
        cache
            .set(key.as_bytes(), &value)
            .with_context(|| format!("write of key {} failed", key))?;
    }
    info!("Wrote {} entries", entries);

    let recent = entries.min(100);
    let hits = (entries - recent..entries)
        .filter(|i| cache.get(i.to_string().as_bytes()).is_ok())
        .count();
    info!("{} of the {} most recent entries readable", hits, recent);

    let occupied = cache.occupied_size()?;
    info!("Occupied size after workload: {} bytes", occupied);

    println!("{}", serde_json::to_string_pretty(&cache.stats())?);
    Ok(())
}

fn env_or(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Deterministic value bytes so repeated runs write identical data.
fn filler(seed: usize, len: usize) -> Vec<u8> {
    (0..len).map(|i| ((seed + i) % 251) as u8).collect()
}
