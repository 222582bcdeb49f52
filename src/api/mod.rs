//! API Module
//!
//! HTTP handlers and routing for the cache diagnostics panel.
//!
//! # Endpoints
//! - `GET /stats` - Tier utilization and counters
//! - `DELETE /invalidate/:namespace` - Invalidate one namespace
//! - `DELETE /clear` - Empty both tiers
//! - `POST /sweep` - Purge expired entries now
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
