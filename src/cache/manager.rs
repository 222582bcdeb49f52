//! Cache Manager Module
//!
//! Orchestrates the memory and persistent tiers: read-through with promotion,
//! writes to both tiers, namespace-scoped invalidation and sweeps.
//!
//! The manager owns both tiers outright. Consumers share one manager as
//! [`SharedCacheManager`] and never touch tier contents directly.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::key::{derive_key, namespace_prefix};
use crate::cache::stats::Counters;
use crate::cache::{CacheEntry, CacheStats, MemoryTier, PersistentTier, TierStats};
use crate::config::Config;
use crate::storage::FileStorage;

/// Cache manager handle shared between the fetch helper, background tasks
/// and the diagnostics API.
pub type SharedCacheManager = Arc<RwLock<CacheManager>>;

// == Set Options ==
/// Per-write options.
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// TTL in milliseconds; `None` uses the manager's default
    pub ttl_ms: Option<u64>,
    /// Whether the entry may be written to the persistent tier
    pub persist: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            ttl_ms: None,
            persist: true,
        }
    }
}

impl SetOptions {
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn with_ttl(self, ttl: Duration) -> Self {
        self.with_ttl_ms(ttl.as_millis() as u64)
    }

    /// Keeps the entry out of persistent storage.
    pub fn memory_only(mut self) -> Self {
        self.persist = false;
        self
    }
}

// == Cache Manager ==
#[derive(Debug)]
pub struct CacheManager {
    memory: MemoryTier,
    persistent: PersistentTier,
    default_ttl_ms: u64,
    max_persist_entry_bytes: usize,
    counters: Counters,
}

impl CacheManager {
    // == Constructors ==
    /// Creates a manager over an already built persistent tier.
    pub fn new(config: &Config, persistent: PersistentTier) -> Self {
        Self {
            memory: MemoryTier::new(config.max_memory_entries, config.eviction_policy),
            persistent,
            default_ttl_ms: config.default_ttl_ms,
            max_persist_entry_bytes: config.max_persist_entry_bytes,
            counters: Counters::default(),
        }
    }

    /// Creates a manager from configuration, opening file storage when
    /// `storage_dir` is set. A directory that cannot be opened leaves the
    /// persistent tier disabled.
    pub fn from_config(config: &Config) -> Self {
        let persistent = match &config.storage_dir {
            Some(dir) => PersistentTier::from_open_result(
                FileStorage::open(dir),
                config.storage_prefix.clone(),
                config.max_storage_entries,
            ),
            None => PersistentTier::disabled(config.storage_prefix.clone(), config.max_storage_entries),
        };
        Self::new(config, persistent)
    }

    /// Creates a manager whose persistent tier is disabled.
    pub fn memory_only(config: &Config) -> Self {
        Self::new(
            config,
            PersistentTier::disabled(config.storage_prefix.clone(), config.max_storage_entries),
        )
    }

    /// Wraps the manager for sharing across tasks.
    pub fn into_shared(self) -> SharedCacheManager {
        Arc::new(RwLock::new(self))
    }

    // == Get ==
    /// Reads a typed value for `(namespace, params)` from either tier.
    ///
    /// A stored payload that does not deserialize into `T` reads as absent
    /// and counts as a miss.
    pub fn get<P, T>(&mut self, namespace: &str, params: &P) -> Option<T>
    where
        P: Serialize + Debug + ?Sized,
        T: DeserializeOwned,
    {
        let key = derive_key(namespace, params);
        let decoded = self.lookup(&key, true).and_then(|entry| {
            match serde_json::from_value(entry.data) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Cached payload for {} has unexpected shape: {}", key, e);
                    None
                }
            }
        });
        self.counters.record_lookup(decoded.is_some());
        decoded
    }

    /// Reads the raw payload. With `use_tiers` false only the memory tier is
    /// consulted.
    pub fn get_value<P>(&mut self, namespace: &str, params: &P, use_tiers: bool) -> Option<Value>
    where
        P: Serialize + Debug + ?Sized,
    {
        let key = derive_key(namespace, params);
        self.get_entry(&key, use_tiers).map(|entry| entry.data)
    }

    /// Key-level read: memory tier first, then the persistent tier with
    /// promotion into memory.
    pub fn get_entry(&mut self, key: &str, use_tiers: bool) -> Option<CacheEntry> {
        let found = self.lookup(key, use_tiers);
        self.counters.record_lookup(found.is_some());
        found
    }

    fn lookup(&mut self, key: &str, use_tiers: bool) -> Option<CacheEntry> {
        if let Some(entry) = self.memory.get(key) {
            debug!("Memory hit for {}", key);
            return Some(entry.clone());
        }

        if use_tiers {
            if let Some(entry) = self.persistent.get(key) {
                // Promotion keeps the original created_at, so TTL is not extended
                let evicted = self.memory.set(key.to_string(), entry.clone());
                self.counters.record_evictions(evicted);
                self.counters.record_promotion();
                debug!("Persistent hit for {}, promoted to memory", key);
                return Some(entry);
            }
        }

        debug!("Cache miss for {}", key);
        None
    }

    // == Set ==
    /// Stores a typed value under `(namespace, params)`.
    ///
    /// A value that cannot be represented as JSON is not cached.
    pub fn set<P, T>(&mut self, namespace: &str, params: &P, data: &T, options: SetOptions)
    where
        P: Serialize + Debug + ?Sized,
        T: Serialize + ?Sized,
    {
        match serde_json::to_value(data) {
            Ok(value) => self.set_value(namespace, params, value, options),
            Err(e) => warn!("Not caching {} payload: {}", namespace, e),
        }
    }

    /// Stores a raw payload.
    ///
    /// Always written to memory; written to the persistent tier when
    /// `options.persist` is set and the payload is under the size threshold.
    /// Otherwise any persisted copy of the key is removed.
    pub fn set_value<P>(&mut self, namespace: &str, params: &P, data: Value, options: SetOptions)
    where
        P: Serialize + Debug + ?Sized,
    {
        self.set_entry(derive_key(namespace, params), data, options);
    }

    /// Key-level write used when the key has already been derived.
    pub fn set_entry(&mut self, key: String, data: Value, options: SetOptions) {
        let ttl_ms = options.ttl_ms.unwrap_or(self.default_ttl_ms);
        let entry = CacheEntry::new(data, ttl_ms);

        let persisted = if !options.persist {
            false
        } else if entry.approx_size_bytes < self.max_persist_entry_bytes {
            self.persistent.set(&key, &entry)
        } else {
            debug!(
                "Entry {} is {} bytes, keeping it memory-only",
                key, entry.approx_size_bytes
            );
            false
        };

        // An older persisted copy must not outlive the value replacing it
        if !persisted {
            self.persistent.delete(&key);
        }

        let evicted = self.memory.set(key, entry);
        self.counters.record_evictions(evicted);
    }

    // == Remove ==
    /// Removes one `(namespace, params)` entry from both tiers.
    pub fn remove<P>(&mut self, namespace: &str, params: &P) -> bool
    where
        P: Serialize + Debug + ?Sized,
    {
        let key = derive_key(namespace, params);
        let in_memory = self.memory.delete(&key);
        let in_storage = self.persistent.delete(&key);
        in_memory || in_storage
    }

    // == Invalidate ==
    /// Removes every entry of `namespace` from both tiers. Returns the number
    /// of entries removed across tiers.
    pub fn invalidate(&mut self, namespace: &str) -> usize {
        let prefix = namespace_prefix(namespace);
        let removed = self.memory.remove_prefix(&prefix) + self.persistent.remove_prefix(&prefix);
        info!("Invalidated namespace '{}': {} entries removed", namespace, removed);
        removed
    }

    // == Clear ==
    /// Empties both tiers.
    pub fn clear(&mut self) {
        self.memory.clear();
        let removed = self.persistent.clear();
        info!("Cache cleared ({} persistent entries removed)", removed);
    }

    // == Sweep ==
    /// Purges expired entries from both tiers. Returns the number removed.
    pub fn sweep(&mut self) -> usize {
        let from_memory = self.memory.sweep();
        self.counters.record_evictions(from_memory);
        from_memory + self.persistent.sweep()
    }

    // == Stats ==
    /// Returns per-tier size and utilization plus read counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory: TierStats::new(self.memory.len(), self.memory.max_entries()),
            persistent: TierStats::new(self.persistent.len(), self.persistent.max_entries()),
            persistent_enabled: self.persistent.is_enabled(),
            hits: self.counters.hits,
            misses: self.counters.misses,
            promotions: self.counters.promotions,
            evictions: self.counters.evictions,
        }
    }

    /// Read-only view of the memory tier.
    pub fn memory_tier(&self) -> &MemoryTier {
        &self.memory
    }

    /// Read-only view of the persistent tier.
    pub fn persistent_tier(&self) -> &PersistentTier {
        &self.persistent
    }

    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }
}
