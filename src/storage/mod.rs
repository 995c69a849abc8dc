//! Storage Module
//!
//! The persistence contract the eviction layer relies on, plus two backends.
//!
//! - `MemoryStore`: process-local map, sized by key and value lengths
//! - `FileStore`: one durable file per key, sized from file metadata

mod file;
mod memory;
mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{PersistentStore, StorageError};
