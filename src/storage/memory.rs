//! In-process storage backend.

use std::collections::HashMap;

use crate::error::{StorageError, StorageResult};
use crate::storage::StorageBackend;

/// Map-backed storage. With a quota it behaves like a small browser store
/// and refuses writes that would push total key+value bytes over the limit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage refusing writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            data: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes of keys and values currently stored.
    pub fn used_bytes(&self) -> usize {
        self.data.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(quota) = self.quota_bytes {
            let replaced = self.data.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let projected = self.used_bytes() - replaced + key.len() + value.len();
            if projected > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StorageResult<bool> {
        Ok(self.data.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.data.keys().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
