//! Cache-Aware Fetch Module
//!
//! Combines the cache manager and the request deduplicator into the one
//! access path data call sites use: return the cached value, or join/start a
//! deduplicated fetch and cache its result.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{derive_key, CacheManager, SetOptions, SharedCacheManager};
use crate::dedup::RequestDeduplicator;

/// Options applied when a fetched value is written to the cache.
pub type FetchOptions = SetOptions;

// == Cached Fetcher ==
/// Read-through fetch helper over one shared cache manager and one
/// deduplicator.
///
/// Call sites combining caching with deduplication go through
/// [`fetch_with_cache`](Self::fetch_with_cache) instead of driving the two
/// managers themselves.
#[derive(Debug, Clone)]
pub struct CachedFetcher {
    cache: SharedCacheManager,
    dedup: RequestDeduplicator,
}

impl CachedFetcher {
    pub fn new(cache: SharedCacheManager, dedup: RequestDeduplicator) -> Self {
        Self { cache, dedup }
    }

    /// Builds a fetcher owning a fresh deduplicator.
    pub fn with_cache(cache: CacheManager) -> Self {
        Self::new(cache.into_shared(), RequestDeduplicator::new())
    }

    pub fn cache(&self) -> &SharedCacheManager {
        &self.cache
    }

    pub fn dedup(&self) -> &RequestDeduplicator {
        &self.dedup
    }

    // == Fetch With Cache ==
    /// Returns the cached value for `(namespace, params)`, or fetches it.
    ///
    /// On a miss, concurrent callers for the same key share one `fetcher`
    /// invocation. A successful result is cached once, before the pending
    /// record is released, so a caller arriving right after settlement hits
    /// the cache. A failure reaches every coalesced caller unchanged and is
    /// never cached.
    pub async fn fetch_with_cache<P, T, E, F, Fut>(
        &self,
        namespace: &str,
        params: &P,
        fetcher: F,
        options: FetchOptions,
    ) -> Result<T, E>
    where
        P: Serialize + Debug + ?Sized,
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(hit) = self.cache.write().await.get::<P, T>(namespace, params) {
            return Ok(hit);
        }

        let key = derive_key(namespace, params);
        let cache = Arc::clone(&self.cache);
        let write_key = key.clone();
        let populate = move || async move {
            let data = fetcher().await?;
            match serde_json::to_value(&data) {
                Ok(value) => {
                    debug!("Caching fetched value for {}", write_key);
                    cache.write().await.set_entry(write_key, value, options);
                }
                Err(e) => warn!("Fetched value for {} is not cacheable: {}", write_key, e),
            }
            Ok::<T, E>(data)
        };

        self.dedup.request(&key, populate).await
    }
}
