//! Cache Module
//!
//! Two-tier cache: a bounded in-process memory tier in front of a bounded
//! persistent tier, both with per-entry TTL, orchestrated by [`CacheManager`].

mod entry;
mod key;
mod manager;
mod memory;
mod persistent;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use key::{derive_key, namespace_prefix, KEY_PARAMS_MAX_LEN};
pub use manager::{CacheManager, SetOptions, SharedCacheManager};
pub use memory::{EvictionPolicy, MemoryTier};
pub use persistent::PersistentTier;
pub use stats::{CacheStats, TierStats};
