// ABOUTME: Route definitions for the PathWise HTTP API.
// ABOUTME: Assembles path, settings, health, and status routes into a single Axum Router.

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route(
            "/api/users/{owner}/paths",
            get(api::paths::list_paths).post(api::paths::create_path),
        )
        .route(
            "/api/paths/{id}",
            get(api::paths::get_path)
                .patch(api::paths::update_path)
                .delete(api::paths::delete_path),
        )
        .route("/api/paths/{id}/progress", post(api::paths::update_progress))
        .route(
            "/api/users/{owner}/settings",
            get(api::settings::get_settings).patch(api::settings::update_settings),
        )
        .route(
            "/api/users/{owner}/settings/{field}",
            put(api::settings::update_setting),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Reports whether the most recent store operation fell back to local storage.
async fn status(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "using_local_fallback": state.using_local_fallback() }))
}
