//! API Routes
//!
//! Configures the Axum router with all diagnostics endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, invalidate_handler, stats_handler, sweep_handler, AppState,
};

/// Creates the diagnostics router with all endpoints configured.
///
/// # Endpoints
/// - `GET /stats` - Tier utilization and counters
/// - `DELETE /invalidate/:namespace` - Invalidate one namespace
/// - `DELETE /clear` - Empty both tiers
/// - `POST /sweep` - Purge expired entries now
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin, so a browser-based panel can call it
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/invalidate/:namespace", delete(invalidate_handler))
        .route("/clear", delete(clear_handler))
        .route("/sweep", post(sweep_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
