//! Response DTOs for the diagnostics API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, TierStats};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Memory tier size and utilization
    pub memory: TierStats,
    /// Persistent tier size and utilization
    pub persistent: TierStats,
    /// Whether persistent storage is available
    pub persistent_enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub promotions: u64,
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Number of fetches currently in flight
    pub pending_requests: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a cache snapshot
    pub fn new(stats: CacheStats, pending_requests: usize) -> Self {
        let hit_rate = stats.hit_rate();
        Self {
            memory: stats.memory,
            persistent: stats.persistent,
            persistent_enabled: stats.persistent_enabled,
            hits: stats.hits,
            misses: stats.misses,
            promotions: stats.promotions,
            evictions: stats.evictions,
            hit_rate,
            pending_requests,
        }
    }
}

/// Response body for namespace invalidation (DELETE /invalidate/:namespace)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub message: String,
    pub namespace: String,
    /// Entries removed across both tiers
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(namespace: impl Into<String>, removed: usize) -> Self {
        let namespace = namespace.into();
        Self {
            message: format!("Namespace '{}' invalidated", namespace),
            namespace,
            removed,
        }
    }
}

/// Response body for DELETE /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for POST /sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    /// Expired entries removed across both tiers
    pub removed: usize,
}

impl SweepResponse {
    pub fn new(removed: usize) -> Self {
        Self { removed }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
