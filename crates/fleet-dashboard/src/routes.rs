//! API route definitions

use crate::handlers;
use crate::state::AppState;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:8080"))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health & Status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::system_status))
        .route("/metrics", get(handlers::metrics))
        // Dashboard read views
        .route("/api/v1/summary", get(handlers::get_summary))
        .route("/api/v1/drones", get(handlers::list_drones))
        .route("/api/v1/drones/{registration}", get(handlers::get_drone))
        .route("/api/v1/map", get(handlers::get_map))
        // User actions
        .route("/api/v1/selection", post(handlers::select_drone))
        .route("/api/v1/options", post(handlers::update_options))
        .route("/api/v1/map/credential", post(handlers::set_map_credential))
        .route("/api/v1/map/drag", post(handlers::drag_map))
        .route("/api/v1/map/events", post(handlers::post_map_event))
        .route("/api/v1/history/clear", post(handlers::clear_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================
