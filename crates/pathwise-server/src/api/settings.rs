// ABOUTME: User settings API handlers: read-with-defaults, multi-field edits, and single-field edits.
// ABOUTME: Unknown fields and mistyped values are rejected with 400 before reaching the store.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pathwise_core::{SettingUpdate, UserSettingsPatch};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{error_response, store_error_response};
use crate::app_state::SharedState;

/// Request body for a single-field update.
#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub value: Value,
}

/// GET /api/users/{owner}/settings - Read settings, creating defaults on first access.
pub async fn get_settings(State(state): State<SharedState>, Path(owner): Path<String>) -> Response {
    match state.settings.get_or_create(&owner).await {
        Ok(fetched) => {
            Json(json!({ "settings": fetched.value, "source": fetched.source })).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

/// PATCH /api/users/{owner}/settings - Merge several settings at once.
pub async fn update_settings(
    State(state): State<SharedState>,
    Path(owner): Path<String>,
    Json(patch): Json<UserSettingsPatch>,
) -> Response {
    if let Some(hours) = patch.goal_hours_per_week
        && !(hours.is_finite() && hours > 0.0)
    {
        return error_response(
            StatusCode::BAD_REQUEST,
            "goalHoursPerWeek must be a positive number",
        );
    }

    match state.settings.update_settings(&owner, &patch).await {
        Ok(done) => Json(json!({ "source": done.source })).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// PUT /api/users/{owner}/settings/{field} - Change one setting.
pub async fn update_setting(
    State(state): State<SharedState>,
    Path((owner, field)): Path<(String, String)>,
    Json(body): Json<SettingValue>,
) -> Response {
    let Some(update) = SettingUpdate::from_field(&field, body.value) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("unknown setting or invalid value: {}", field),
        );
    };

    match state.settings.update_setting(&owner, update).await {
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

    #[tokio::test]
    async fn first_read_returns_defaults() {
        let (_remote, state) = test_state();

        let (status, json) = send(&state, "GET", "/api/users/u1/settings", None).await;
        assert_eq!(status, 200);
        assert_eq!(json["source"], "remote");
        assert_eq!(json["settings"]["userId"], "u1");
        assert_eq!(json["settings"]["theme"], "system");
        assert_eq!(json["settings"]["goalHoursPerWeek"], 15.0);
        assert_eq!(json["settings"]["dashboardLayout"], "standard");
    }

    #[tokio::test]
    async fn single_field_update() {
        let (_remote, state) = test_state();
        send(&state, "GET", "/api/users/u1/settings", None).await;

        let (status, json) = send(
            &state,
            "PUT",
            "/api/users/u1/settings/theme",
            Some(json!({"value": "dark"})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(json["source"], "remote");

        let (_, json) = send(&state, "GET", "/api/users/u1/settings", None).await;
        assert_eq!(json["settings"]["theme"], "dark");
    }

    #[tokio::test]
    async fn single_field_update_rejects_bad_input() {
        let (_remote, state) = test_state();

        let (status, _) = send(
            &state,
            "PUT",
            "/api/users/u1/settings/fontSize",
            Some(json!({"value": 12})),
        )
        .await;
        assert_eq!(status, 400);

        let (status, _) = send(
            &state,
            "PUT",
            "/api/users/u1/settings/goalHoursPerWeek",
            Some(json!({"value": -1})),
        )
        .await;
        assert_eq!(status, 400);

        let (status, _) = send(
            &state,
            "PUT",
            "/api/users/u1/settings/emailNotifications",
            Some(json!({"value": "yes"})),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn multi_field_update_during_outage_is_local() {
        let (remote, state) = test_state();
        remote.fail_all(RemoteError::Network("offline".to_string()));

        let (status, json) = send(
            &state,
            "PATCH",
            "/api/users/u1/settings",
            Some(json!({"accentColor": "#10b981", "emailNotifications": false})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(json["source"], "local");

        let (_, json) = send(&state, "GET", "/api/users/u1/settings", None).await;
        assert_eq!(json["source"], "local");
        assert_eq!(json["settings"]["accentColor"], "#10b981");
        assert_eq!(json["settings"]["emailNotifications"], false);
        assert_eq!(json["settings"]["theme"], "system");
    }

    #[tokio::test]
    async fn multi_field_update_rejects_nonpositive_goal() {
        let (_remote, state) = test_state();

        let (status, json) = send(
            &state,
            "PATCH",
            "/api/users/u1/settings",
            Some(json!({"goalHoursPerWeek": 0})),
        )
        .await;
        assert_eq!(status, 400);
        assert!(json["error"].as_str().unwrap().contains("goalHoursPerWeek"));
    }
}
