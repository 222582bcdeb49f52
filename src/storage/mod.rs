//! Storage Module
//!
//! Durable key-value backends consumed by the persistent cache tier.
//!
//! # Backends
//! - [`MemoryStorage`]: in-process map with an optional byte quota
//! - [`FileStorage`]: one file per key under a directory

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageResult;

// == Storage Backend ==
/// Synchronous string key-value store.
///
/// `set` may fail with [`StorageError::QuotaExceeded`](crate::error::StorageError::QuotaExceeded)
/// when the backend is full; callers are expected to free space and retry.
pub trait StorageBackend: Send + Sync {
    /// Reads a value, `None` if absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes a value. Returns true if it was present.
    fn delete(&mut self, key: &str) -> StorageResult<bool>;

    /// Lists every stored key.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;
}
