//! Configuration Module
//!
//! Handles loading cache and diagnostics server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::EvictionPolicy;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the memory tier, in entries
    pub max_memory_entries: usize,
    /// Capacity of the persistent tier, in entries
    pub max_storage_entries: usize,
    /// TTL in milliseconds for writes that do not pass one
    pub default_ttl_ms: u64,
    /// Entries whose payload estimate reaches this size stay memory-only
    pub max_persist_entry_bytes: usize,
    /// Reserved prefix for keys written to persistent storage
    pub storage_prefix: String,
    /// Directory for the persistent tier; `None` runs memory-only
    pub storage_dir: Option<PathBuf>,
    /// Memory-tier eviction order
    pub eviction_policy: EvictionPolicy,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Diagnostics HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY_ENTRIES` - Memory tier capacity (default: 100)
    /// - `MAX_STORAGE_ENTRIES` - Persistent tier capacity (default: 500)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `MAX_PERSIST_ENTRY_BYTES` - Persistence size threshold (default: 102400)
    /// - `STORAGE_PREFIX` - Persistent key prefix (default: `tcache_`)
    /// - `STORAGE_DIR` - Persistent tier directory (default: unset, memory-only)
    /// - `EVICTION_POLICY` - `creation` or `lru` (default: creation)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 30)
    /// - `SERVER_PORT` - Diagnostics HTTP port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_entries: parse_var("MAX_MEMORY_ENTRIES").unwrap_or(defaults.max_memory_entries),
            max_storage_entries: parse_var("MAX_STORAGE_ENTRIES").unwrap_or(defaults.max_storage_entries),
            default_ttl_ms: parse_var("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            max_persist_entry_bytes: parse_var("MAX_PERSIST_ENTRY_BYTES")
                .unwrap_or(defaults.max_persist_entry_bytes),
            storage_prefix: env::var("STORAGE_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.storage_prefix),
            storage_dir: env::var("STORAGE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            eviction_policy: parse_var("EVICTION_POLICY").unwrap_or(defaults.eviction_policy),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory_entries: 100,
            max_storage_entries: 500,
            default_ttl_ms: 5 * 60 * 1000,
            max_persist_entry_bytes: 100 * 1024,
            storage_prefix: "tcache_".to_string(),
            storage_dir: None,
            eviction_policy: EvictionPolicy::CreationOrder,
            sweep_interval: 30,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_memory_entries, 100);
        assert_eq!(config.max_storage_entries, 500);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.max_persist_entry_bytes, 102_400);
        assert_eq!(config.storage_prefix, "tcache_");
        assert!(config.storage_dir.is_none());
        assert_eq!(config.eviction_policy, EvictionPolicy::CreationOrder);
        assert_eq!(config.sweep_interval, 30);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment so parallel tests cannot race on it
        for name in [
            "MAX_MEMORY_ENTRIES",
            "MAX_STORAGE_ENTRIES",
            "DEFAULT_TTL_MS",
            "MAX_PERSIST_ENTRY_BYTES",
            "STORAGE_PREFIX",
            "STORAGE_DIR",
            "EVICTION_POLICY",
            "SWEEP_INTERVAL",
            "SERVER_PORT",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.max_memory_entries, 100);
        assert!(config.storage_dir.is_none());

        env::set_var("MAX_MEMORY_ENTRIES", "250");
        env::set_var("EVICTION_POLICY", "lru");
        env::set_var("STORAGE_DIR", "/tmp/tiered-cache");
        env::set_var("SERVER_PORT", "not-a-port");

        let config = Config::from_env();
        assert_eq!(config.max_memory_entries, 250);
        assert_eq!(config.eviction_policy, EvictionPolicy::LeastRecentlyUsed);
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/tiered-cache")));
        assert_eq!(config.server_port, 3000);

        env::remove_var("MAX_MEMORY_ENTRIES");
        env::remove_var("EVICTION_POLICY");
        env::remove_var("STORAGE_DIR");
        env::remove_var("SERVER_PORT");
    }
}
