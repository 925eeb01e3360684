//! Route definitions for the gateway API.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware, state::AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let cors_enabled = state.config.server.cors_enabled;

    let router = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/v1", generation_routes())
        .nest("/admin", admin_routes())
        // Outermost last: request ids are assigned before logging sees them
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware));

    let router = if cors_enabled {
        router.layer(middleware::cors_layer())
    } else {
        router
    };

    router.with_state(state)
}

/// Generation API routes
fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(handlers::generate))
        .route("/generate/stream", post(handlers::generate_stream))
}

/// Admin/management routes
fn admin_routes() -> Router<AppState> {
    Router::new().route("/providers", get(handlers::provider_health))
}
