//! REST surface for the gateway.
//!
//! Routes:
//! - GET    /api/v1/                                - API root (public)
//! - GET    /api/v1/status                          - Dependency health (public)
//! - POST   /api/v1/gateway/process_request         - Messages-based flow
//! - POST   /api/v1/gateway/legacy/process_request  - Intent dispatch flow
//!
//! Gateway routes require a bearer token; the middleware turns it into an
//! [`Identity`](crate::identity::Identity) before any handler runs.

pub mod auth;
pub mod error;
mod routes;

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use crate::gateway::Gateway;
use crate::health::HealthAggregator;
use auth::{jwt_auth, JwtConfig};

pub use error::{ApiError, REQUEST_ID_HEADER};

/// Build the full axum router with all routes and middleware.
pub fn build_router(
    gateway: Arc<Gateway>,
    health: Arc<HealthAggregator>,
    jwt_config: JwtConfig,
) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        .route(
            "/api/v1/gateway/process_request",
            post(routes::process_request),
        )
        .route(
            "/api/v1/gateway/legacy/process_request",
            post(routes::legacy_process_request),
        )
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new()
        .route("/api/v1", get(routes::api_root))
        .route("/api/v1/", get(routes::api_root))
        .route("/api/v1/status", get(routes::get_status));

    public
        .merge(protected)
        .layer(Extension(gateway))
        .layer(Extension(health))
        .layer(TraceLayer::new_for_http())
}
