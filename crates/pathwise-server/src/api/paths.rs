// ABOUTME: Learning-path API handlers for listing, creating, reading, editing, and deleting paths.
// ABOUTME: Validates input before it reaches the store and reports which backend served each call.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use pathwise_core::{LearningPathPatch, NewLearningPath, ProgressUpdate};
use serde::Deserialize;
use serde_json::json;

use crate::api::{error_response, store_error_response};
use crate::app_state::SharedState;

/// Request body for creating a path. The owner comes from the URL.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePathRequest {
    pub title: String,
    pub total_courses: u32,
    pub deadline: DateTime<Utc>,
}

/// GET /api/users/{owner}/paths - List the owner's paths.
pub async fn list_paths(State(state): State<SharedState>, Path(owner): Path<String>) -> Response {
    let listed = state.paths.list_by_owner(&owner).await;
    Json(json!({ "paths": listed.value, "source": listed.source })).into_response()
}

/// POST /api/users/{owner}/paths - Create a path with zero progress.
pub async fn create_path(
    State(state): State<SharedState>,
    Path(owner): Path<String>,
    Json(req): Json<CreatePathRequest>,
) -> Response {
    let draft = NewLearningPath::new(owner, req.title, req.total_courses, req.deadline);
    if let Err(e) = draft.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.paths.add_path(draft).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(json!({ "id": created.value, "source": created.source })),
        )
            .into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /api/paths/{id} - Read one path.
pub async fn get_path(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let fetched = state.paths.get(&id).await;
    match fetched.value {
        Some(path) => Json(json!({ "path": path, "source": fetched.source })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("path not found: {}", id)),
    }
}

/// PATCH /api/paths/{id} - Merge edited fields into a path.
pub async fn update_path(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<LearningPathPatch>,
) -> Response {
    if let Err(e) = patch.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.paths.update(&id, &patch).await {
        Ok(done) => Json(json!({ "source": done.source })).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// DELETE /api/paths/{id} - Remove a path. Deleting a missing path succeeds.
pub async fn delete_path(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    match state.paths.delete(&id).await {
        Ok(done) => Json(json!({ "source": done.source })).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/paths/{id}/progress - Record progress and mark the path as just accessed.
pub async fn update_progress(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(update): Json<ProgressUpdate>,
) -> Response {
    let current = state.paths.get(&id).await;
    let Some(path) = current.value else {
        return error_response(StatusCode::NOT_FOUND, format!("path not found: {}", id));
    };
    if let Err(e) = update.validate(Some(path.total_courses)) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state.paths.update_progress(&id, update).await {
        Ok(done) => Json(json!({ "source": done.source })).into_response(),
        Err(e) => store_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::app_state::{AppState, SharedState};
    use crate::routes::create_router;
    use axum::body::Body;
    use http::Request;
    use pathwise_store::testing::MemoryRemote;
    use pathwise_store::{MemoryLocal, RemoteError};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> (Arc<MemoryRemote>, SharedState) {
        let remote = Arc::new(MemoryRemote::new());
        let state = Arc::new(AppState::new(remote.clone(), Arc::new(MemoryLocal::new())));
        (remote, state)
    }

    async fn send(state: &SharedState, method: &str, uri: &str, body: Option<Value>) -> (u16, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = create_router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status().as_u16();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn rust_basics() -> Value {
        json!({
            "title": "Rust Basics",
            "totalCourses": 5,
            "deadline": "2026-12-31T23:59:59Z"
        })
    }

    #[tokio::test]
    async fn create_path_returns_201() {
        let (_remote, state) = test_state();

        let (status, json) = send(&state, "POST", "/api/users/u1/paths", Some(rust_basics())).await;
        assert_eq!(status, 201);
        assert_eq!(json["source"], "remote");
        let id = json["id"].as_str().unwrap().to_string();

        let (status, json) = send(&state, "GET", &format!("/api/paths/{}", id), None).await;
        assert_eq!(status, 200);
        assert_eq!(json["path"]["title"], "Rust Basics");
        assert_eq!(json["path"]["userId"], "u1");
        assert_eq!(json["path"]["progress"], 0);
        assert_eq!(json["path"]["lastAccessed"], "Never");
    }

    #[tokio::test]
    async fn create_path_rejects_invalid_draft() {
        let (_remote, state) = test_state();

        let (status, json) = send(
            &state,
            "POST",
            "/api/users/u1/paths",
            Some(json!({"title": "Go", "totalCourses": 5, "deadline": "2026-12-31T00:00:00Z"})),
        )
        .await;
        assert_eq!(status, 400);
        assert!(json["error"].as_str().unwrap().contains("3 characters"));

        let (status, _) = send(
            &state,
            "POST",
            "/api/users/u1/paths",
            Some(json!({"title": "Rust", "totalCourses": 0, "deadline": "2026-12-31T00:00:00Z"})),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn list_reports_local_source_during_outage() {
        let (remote, state) = test_state();
        send(&state, "POST", "/api/users/u1/paths", Some(rust_basics())).await;

        let (_, json) = send(&state, "GET", "/api/users/u1/paths", None).await;
        assert_eq!(json["source"], "remote");
        assert_eq!(json["paths"].as_array().unwrap().len(), 1);

        remote.fail_all(RemoteError::Network("offline".to_string()));
        let (status, json) = send(&state, "GET", "/api/users/u1/paths", None).await;
        assert_eq!(status, 200);
        assert_eq!(json["source"], "local");
        assert_eq!(json["paths"][0]["title"], "Rust Basics");
    }

    #[tokio::test]
    async fn create_during_outage_returns_local_key() {
        let (remote, state) = test_state();
        remote.fail_all(RemoteError::PermissionDenied("rules".to_string()));

        let (status, json) = send(&state, "POST", "/api/users/u1/paths", Some(rust_basics())).await;
        assert_eq!(status, 201);
        assert_eq!(json["source"], "local");
        assert!(json["id"].as_str().unwrap().starts_with("local-"));
    }

    #[tokio::test]
    async fn patch_updates_and_validates() {
        let (_remote, state) = test_state();
        let (_, created) = send(&state, "POST", "/api/users/u1/paths", Some(rust_basics())).await;
        let uri = format!("/api/paths/{}", created["id"].as_str().unwrap());

        let (status, json) = send(&state, "PATCH", &uri, Some(json!({"title": "Advanced Rust"}))).await;
        assert_eq!(status, 200);
        assert_eq!(json["source"], "remote");

        let (_, json) = send(&state, "GET", &uri, None).await;
        assert_eq!(json["path"]["title"], "Advanced Rust");

        let (status, _) = send(&state, "PATCH", &uri, Some(json!({"progress": 101}))).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn patch_unknown_path_during_outage_is_404() {
        let (remote, state) = test_state();
        remote.fail_all(RemoteError::Network("offline".to_string()));

        let (status, json) =
            send(&state, "PATCH", "/api/paths/missing", Some(json!({"progress": 10}))).await;
        assert_eq!(status, 404);
        assert!(json["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn progress_marks_path_just_accessed() {
        let (_remote, state) = test_state();
        let (_, created) = send(&state, "POST", "/api/users/u1/paths", Some(rust_basics())).await;
        let id = created["id"].as_str().unwrap();

        let (status, json) = send(
            &state,
            "POST",
            &format!("/api/paths/{}/progress", id),
            Some(json!({"progress": 40, "completedCourses": 2})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(json["source"], "remote");

        let (_, json) = send(&state, "GET", &format!("/api/paths/{}", id), None).await;
        assert_eq!(json["path"]["progress"], 40);
        assert_eq!(json["path"]["completedCourses"], 2);
        assert_eq!(json["path"]["lastAccessed"], "Just now");
    }

    #[tokio::test]
    async fn progress_rejects_more_completed_than_total() {
        let (_remote, state) = test_state();
        let (_, created) = send(&state, "POST", "/api/users/u1/paths", Some(rust_basics())).await;
        let id = created["id"].as_str().unwrap();

        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/paths/{}/progress", id),
            Some(json!({"progress": 100, "completedCourses": 6})),
        )
        .await;
        assert_eq!(status, 400);

        let (status, _) = send(
            &state,
            "POST",
            "/api/paths/missing/progress",
            Some(json!({"progress": 10, "completedCourses": 1})),
        )
        .await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_remote, state) = test_state();
        let (_, created) = send(&state, "POST", "/api/users/u1/paths", Some(rust_basics())).await;
        let uri = format!("/api/paths/{}", created["id"].as_str().unwrap());

        let (status, _) = send(&state, "DELETE", &uri, None).await;
        assert_eq!(status, 200);
        let (status, _) = send(&state, "DELETE", &uri, None).await;
        assert_eq!(status, 200);

        let (status, _) = send(&state, "GET", &uri, None).await;
        assert_eq!(status, 404);
    }
}
