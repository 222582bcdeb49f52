//! Cache Statistics Module
//!
//! Per-tier utilization plus hit, miss and eviction counters, reported to the
//! diagnostics panel. Reading stats has no side effects on the cache.

use serde::Serialize;

// == Tier Stats ==
/// Size snapshot of one tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierStats {
    /// Current number of stored entries
    pub size: usize,
    /// Configured capacity
    pub max_size: usize,
    /// `size / max_size` as a percentage, 0 for a zero-capacity tier
    pub utilization_pct: f64,
}

impl TierStats {
    pub fn new(size: usize, max_size: usize) -> Self {
        let utilization_pct = if max_size == 0 {
            0.0
        } else {
            size as f64 / max_size as f64 * 100.0
        };
        Self {
            size,
            max_size,
            utilization_pct,
        }
    }
}

// == Cache Stats ==
/// Snapshot returned by [`CacheManager::stats`](crate::cache::CacheManager::stats).
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub memory: TierStats,
    pub persistent: TierStats,
    /// Whether the persistent tier has a working backend
    pub persistent_enabled: bool,
    /// Reads answered from either tier
    pub hits: u64,
    /// Reads found in neither tier
    pub misses: u64,
    /// Reads answered from the persistent tier and copied into memory
    pub promotions: u64,
    /// Memory-tier entries removed by capacity or expiry sweeps
    pub evictions: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Counters ==
/// Running counters kept by the cache manager.
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub promotions: u64,
    pub evictions: u64,
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.record_hit();
        } else {
            self.record_miss();
        }
    }

    pub fn record_promotion(&mut self) {
        self.promotions += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }
}
