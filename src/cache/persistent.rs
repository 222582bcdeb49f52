//! Persistent Tier Module
//!
//! Bounded durable map over a [`StorageBackend`]. Survives restarts, slower
//! than the memory tier, and may run out of space.
//!
//! Storage failures never escape this module: a write that still fails after
//! one cleanup-and-retry is dropped, and a tier without a backend behaves as
//! an always-empty no-op.

use tracing::{debug, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::CacheEntry;
use crate::error::{StorageError, StorageResult};
use crate::storage::StorageBackend;

// == Persistent Tier ==
pub struct PersistentTier {
    /// `None` when storage could not be opened
    backend: Option<Box<dyn StorageBackend>>,
    /// Reserved prefix marking keys owned by this cache
    prefix: String,
    max_entries: usize,
}

impl PersistentTier {
    // == Constructors ==
    /// Creates a tier over an opened backend.
    pub fn new(backend: Box<dyn StorageBackend>, prefix: impl Into<String>, max_entries: usize) -> Self {
        Self {
            backend: Some(backend),
            prefix: prefix.into(),
            max_entries,
        }
    }

    /// Creates a tier that stores nothing.
    pub fn disabled(prefix: impl Into<String>, max_entries: usize) -> Self {
        Self {
            backend: None,
            prefix: prefix.into(),
            max_entries,
        }
    }

    /// Creates a tier from the outcome of opening a backend, degrading to
    /// [`disabled`](Self::disabled) on failure.
    pub fn from_open_result<B>(opened: StorageResult<B>, prefix: impl Into<String>, max_entries: usize) -> Self
    where
        B: StorageBackend + 'static,
    {
        match opened {
            Ok(backend) => Self::new(Box::new(backend), prefix, max_entries),
            Err(e) => {
                warn!("Persistent storage unavailable, running memory-only: {}", e);
                Self::disabled(prefix, max_entries)
            }
        }
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Get ==
    /// Returns the entry if stored and not expired.
    ///
    /// Expired or unreadable entries found here are deleted on the spot.
    pub fn get(&mut self, key: &str) -> Option<CacheEntry> {
        let storage_key = self.storage_key(key);
        let backend = self.backend.as_mut()?;

        let raw = match backend.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Persistent read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.is_expired() => Some(entry),
            Ok(_) => {
                debug!("Purging expired persistent entry {}", key);
                let _ = backend.delete(&storage_key);
                None
            }
            Err(e) => {
                warn!("Discarding unreadable persistent entry {}: {}", key, e);
                let _ = backend.delete(&storage_key);
                None
            }
        }
    }

    // == Set ==
    /// Writes an entry. Returns true if it was stored.
    ///
    /// On quota failure runs one cleanup and retries once; a second failure
    /// drops the write.
    pub fn set(&mut self, key: &str, entry: &CacheEntry) -> bool {
        if self.backend.is_none() {
            return false;
        }

        let raw = match serde_json::to_string(entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cannot serialize entry {} for persistence: {}", key, e);
                return false;
            }
        };
        let storage_key = self.storage_key(key);

        let stored = match self.write(&storage_key, &raw) {
            Ok(()) => true,
            Err(StorageError::QuotaExceeded) => {
                let removed = self.cleanup();
                debug!("Quota exceeded writing {}, cleanup removed {} entries", key, removed);
                match self.write(&storage_key, &raw) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Dropping persistent write for {} after retry: {}", key, e);
                        false
                    }
                }
            }
            Err(e) => {
                warn!("Persistent write failed for {}: {}", key, e);
                false
            }
        };

        if stored && self.len() > self.max_entries {
            self.cleanup();
        }
        stored
    }

    fn write(&mut self, storage_key: &str, raw: &str) -> StorageResult<()> {
        match self.backend.as_mut() {
            Some(backend) => backend.set(storage_key, raw),
            None => Err(StorageError::Unavailable("no backend".to_string())),
        }
    }

    // == Delete ==
    /// Removes an entry. Returns true if it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let storage_key = self.storage_key(key);
        match self.backend.as_mut() {
            Some(backend) => backend.delete(&storage_key).unwrap_or_else(|e| {
                warn!("Persistent delete failed for {}: {}", key, e);
                false
            }),
            None => false,
        }
    }

    /// Cache keys (prefix stripped) currently held in storage.
    fn owned_keys(&self) -> Vec<String> {
        let Some(backend) = self.backend.as_ref() else {
            return Vec::new();
        };
        match backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
                .collect(),
            Err(e) => {
                warn!("Cannot enumerate persistent storage: {}", e);
                Vec::new()
            }
        }
    }

    // == Remove Prefix ==
    /// Removes every entry whose cache key starts with `key_prefix`.
    pub fn remove_prefix(&mut self, key_prefix: &str) -> usize {
        self.owned_keys()
            .into_iter()
            .filter(|key| key.starts_with(key_prefix))
            .filter(|key| self.delete(key))
            .count()
    }

    // == Clear ==
    /// Removes every entry carrying this cache's prefix. Other keys in the
    /// backend are left alone.
    pub fn clear(&mut self) -> usize {
        self.remove_prefix("")
    }

    // == Sweep ==
    /// Removes expired and unreadable entries. Returns the number removed.
    pub fn sweep(&mut self) -> usize {
        let now = current_timestamp_ms();
        let (_, dead) = self.scan(now);
        dead.iter().filter(|key| self.delete(key)).count()
    }

    // == Cleanup ==
    /// Frees space: drops expired and unreadable entries, then the oldest by
    /// `created_at` until under capacity. Returns the number removed.
    pub fn cleanup(&mut self) -> usize {
        let now = current_timestamp_ms();
        let (mut live, dead) = self.scan(now);
        let mut removed = dead.iter().filter(|key| self.delete(key)).count();

        if live.len() > self.max_entries {
            live.sort_unstable_by_key(|(created_at, _)| *created_at);
            let excess = live.len() - self.max_entries;
            for (_, key) in live.into_iter().take(excess) {
                if self.delete(&key) {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Splits owned entries into live `(created_at, key)` pairs and dead keys.
    /// Keys whose read fails are left out of both.
    fn scan(&self, now: u64) -> (Vec<(u64, String)>, Vec<String>) {
        let mut live = Vec::new();
        let mut dead = Vec::new();
        let Some(backend) = self.backend.as_ref() else {
            return (live, dead);
        };

        for key in self.owned_keys() {
            let raw = match backend.get(&self.storage_key(&key)) {
                Ok(raw) => raw,
                Err(e) => {
                    // Left for the next scan
                    debug!("Skipping {} during scan: {}", key, e);
                    continue;
                }
            };
            match raw.and_then(|raw| serde_json::from_str::<CacheEntry>(&raw).ok()) {
                Some(entry) if !entry.is_expired_at(now) => live.push((entry.created_at, key)),
                _ => dead.push(key),
            }
        }
        (live, dead)
    }

    // == Length ==
    /// Number of entries carrying this cache's prefix.
    pub fn len(&self) -> usize {
        self.owned_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("disabled")
    }
}

impl std::fmt::Debug for PersistentTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentTier")
            .field("backend", &self.backend_name())
            .field("prefix", &self.prefix)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
