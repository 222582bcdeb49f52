//! Tiered Cache - memory + persistent cache with request deduplication
//!
//! Sits between data-access call sites and a remote data source: values are
//! served from a bounded memory tier, then a bounded persistent tier, and on
//! a miss concurrent callers share one fetch whose result is cached.

pub mod api;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, SetOptions, SharedCacheManager};
pub use config::Config;
pub use dedup::RequestDeduplicator;
pub use fetch::{CachedFetcher, FetchOptions};
pub use tasks::spawn_sweep_task;
