//! API Handlers
//!
//! HTTP request handlers for each diagnostics endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheManager, SharedCacheManager};
use crate::config::Config;
use crate::dedup::RequestDeduplicator;
use crate::error::{ApiError, ApiResult};
use crate::fetch::CachedFetcher;
use crate::models::{ClearResponse, HealthResponse, InvalidateResponse, StatsResponse, SweepResponse};

/// Application state shared across all handlers.
///
/// Holds the same cache manager and deduplicator handed to the application's
/// fetch helper, so the panel reports on live state.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache manager
    pub cache: SharedCacheManager,
    /// Shared deduplicator, read for its pending count
    pub dedup: RequestDeduplicator,
}

impl AppState {
    /// Creates a new AppState around an existing manager and deduplicator.
    pub fn new(cache: SharedCacheManager, dedup: RequestDeduplicator) -> Self {
        Self { cache, dedup }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CacheManager::from_config(config).into_shared(),
            RequestDeduplicator::new(),
        )
    }

    /// Returns a fetch helper sharing this state's manager and deduplicator.
    pub fn fetcher(&self) -> CachedFetcher {
        CachedFetcher::new(self.cache.clone(), self.dedup.clone())
    }
}

/// Handler for GET /stats
///
/// Returns per-tier utilization and read counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.read().await.stats();
    Json(StatsResponse::new(stats, state.dedup.pending_count()))
}

/// Handler for DELETE /invalidate/:namespace
///
/// Drops every entry of one namespace from both tiers.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> ApiResult<Json<InvalidateResponse>> {
    if namespace.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Namespace cannot be empty".to_string()));
    }

    let removed = state.cache.write().await.invalidate(&namespace);
    Ok(Json(InvalidateResponse::new(namespace, removed)))
}

/// Handler for DELETE /clear
///
/// Empties both tiers.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.write().await.clear();
    Json(ClearResponse::new())
}

/// Handler for POST /sweep
///
/// Purges expired entries now instead of waiting for the background sweep.
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    let removed = state.cache.write().await.sweep();
    Json(SweepResponse::new(removed))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SetOptions;

    fn test_state() -> AppState {
        AppState::new(
            CacheManager::memory_only(&Config::default()).into_shared(),
            RequestDeduplicator::new(),
        )
    }

    #[tokio::test]
    async fn test_stats_handler_empty() {
        let state = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.memory.size, 0);
        assert_eq!(response.memory.max_size, 100);
        assert!(!response.persistent_enabled);
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = test_state();
        {
            let mut cache = state.cache.write().await;
            cache.set("ventures", "u1", &"A", SetOptions::default());
            cache.set("kpis", "u1", &"B", SetOptions::default());
        }

        let result = invalidate_handler(State(state.clone()), Path("ventures".to_string())).await;
        let response = result.unwrap();
        assert_eq!(response.removed, 1);

        let mut cache = state.cache.write().await;
        assert_eq!(cache.get::<_, String>("ventures", "u1"), None);
        assert_eq!(cache.get::<_, String>("kpis", "u1").as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_invalidate_blank_namespace() {
        let state = test_state();

        let result = invalidate_handler(State(state), Path("  ".to_string())).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = test_state();
        state
            .cache
            .write()
            .await
            .set("kpis", &1, &1, SetOptions::default());

        clear_handler(State(state.clone())).await;

        assert!(state.cache.read().await.memory_tier().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_handler_nothing_expired() {
        let state = test_state();
        state
            .cache
            .write()
            .await
            .set("kpis", &1, &1, SetOptions::default());

        let response = sweep_handler(State(state)).await;
        assert_eq!(response.removed, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_state_fetcher_shares_cache() {
        let state = test_state();

        let value: Result<u32, String> = state
            .fetcher()
            .fetch_with_cache("kpis", &9, || async { Ok(9) }, Default::default())
            .await;
        assert_eq!(value, Ok(9));

        let response = stats_handler(State(state)).await;
        assert_eq!(response.memory.size, 1);
    }
}
