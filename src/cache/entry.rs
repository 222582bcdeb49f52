//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with per-entry TTL.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with payload and metadata.
///
/// Entries are shared by both tiers; the persistent tier stores them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored payload
    pub data: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time-to-live in milliseconds, counted from `created_at`
    pub ttl_ms: u64,
    /// Estimated serialized size of `data` in bytes
    pub approx_size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    ///
    /// # Arguments
    /// * `data` - The payload to store
    /// * `ttl_ms` - Time-to-live in milliseconds
    pub fn new(data: Value, ttl_ms: u64) -> Self {
        Self::with_created_at(data, ttl_ms, current_timestamp_ms())
    }

    /// Creates an entry with an explicit creation timestamp.
    pub fn with_created_at(data: Value, ttl_ms: u64, created_at: u64) -> Self {
        let approx_size_bytes = estimate_size(&data);
        Self {
            data,
            created_at,
            ttl_ms,
            approx_size_bytes,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once strictly more than `ttl_ms` has elapsed since
    /// creation. An entry read exactly at `created_at + ttl_ms` is still live.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) > self.ttl_ms
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let expires = self.created_at.saturating_add(self.ttl_ms);
        expires.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
///
/// A clock set before the epoch reads as 0.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Estimates the serialized size of a payload.
fn estimate_size(data: &Value) -> usize {
    serde_json::to_string(data).map(|s| s.len()).unwrap_or(0)
}
