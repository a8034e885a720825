// ABOUTME: API module containing all HTTP handler functions for the PathWise REST API.
// ABOUTME: Shares the JSON error shape and the mapping from store failures to status codes.

pub mod paths;
pub mod settings;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pathwise_store::StoreError;
use serde_json::json;

/// A `{"error": message}` body with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Map a store failure to 404 for missing records and 500 for storage faults.
pub(crate) fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(_) => error_response(StatusCode::NOT_FOUND, err.to_string()),
        other => {
            tracing::error!("store operation failed: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}
