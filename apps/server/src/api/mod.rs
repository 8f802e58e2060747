//! API layer - routes and handlers

pub mod handlers;

use crate::state::AppState;
use axum::{
    http::HeaderValue,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Entity search (JSON and GeoJSON representations)
        .route("/entity", get(handlers::search::search_json))
        .route("/entity.json", get(handlers::search::search_json))
        .route("/entity.geojson", get(handlers::search::search_geojson))
        // Single entity lookup
        .route("/entity/:entity", get(handlers::entity::get_entity))
        // Dataset entity counts
        .route(
            "/dataset/:dataset/count",
            get(handlers::dataset::get_dataset_count),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
