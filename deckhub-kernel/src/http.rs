/**
 * API HTTP DECKHUB - Routes REST + upgrade WebSocket du kernel
 *
 * ROUTES :
 * - /health, /system/health : supervision
 * - /api/pages, /api/buttons : configuration (lecture seule)
 * - /api/execute-action : dispatch d'une action (même flux qu'un press WS)
 * - /ws : canal temps réel
 */

use axum::http::StatusCode;
use axum::{extract::State, routing::{get, post}, Json, Router};
use deckhub_contracts::{ActionIntent, ActionKind, ButtonId, ButtonTable, Page};
use serde::Deserialize;
use std::sync::Arc;

use crate::coordinator::BroadcastCoordinator;
use crate::gateway::ActionGateway;
use crate::health::{HealthTracker, KernelHealth};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BroadcastCoordinator>,
    pub gateway: Arc<ActionGateway>,
    pub health_tracker: HealthTracker,
    pub pages: Arc<Vec<Page>>,
    pub buttons: Arc<ButtonTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteActionRequest {
    id: ButtonId,
    action_type: ActionKind,
    #[serde(default)]
    action_value: String,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/api/pages", get(list_pages))
        .route("/api/buttons", get(list_buttons))
        .route("/api/execute-action", post(execute_action))
        .route("/ws", get(crate::ws::ws_handler))
        .with_state(app_state)
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.coordinator))
}

// GET /api/pages (ordre de la config)
async fn list_pages(State(app): State<AppState>) -> Json<Vec<Page>> {
    Json(app.pages.as_ref().clone())
}

// GET /api/buttons
async fn list_buttons(State(app): State<AppState>) -> Json<ButtonTable> {
    Json(app.buttons.as_ref().clone())
}

// POST /api/execute-action
async fn execute_action(
    State(app): State<AppState>,
    Json(req): Json<ExecuteActionRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let intent = ActionIntent {
        button_id: req.id,
        action_kind: req.action_type,
        action_payload: req.action_value,
    };
    match app.gateway.dispatch_and_publish(intent).await {
        Ok(feedback) => (StatusCode::OK, Json(serde_json::json!({ "result": feedback }))),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": e.code(), "message": e.to_string() })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app_state, recv_frames};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use deckhub_contracts::{BroadcastEvent, FeedbackEvent, ServerMessage};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: AppState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = build_router(app).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let resp = build_router(app_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let (status, body) = call(app_state(), Request::get("/system/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn test_pages_and_buttons() {
        let (status, body) = call(app_state(), Request::get("/api/pages").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0], json!({"id": "page1", "name": "Main"}));

        let (_, body) = call(app_state(), Request::get("/api/buttons").body(Body::empty()).unwrap()).await;
        let first = &body[0];
        assert_eq!(first["label"], "START");
        assert_eq!(first["actionKind"], "keystroke");
    }

    #[tokio::test]
    async fn test_execute_action_broadcasts_feedback() {
        let app = app_state();
        let (_, mut rx) = app.coordinator.connect().unwrap();
        recv_frames(&mut rx);

        let req = post_json(
            "/api/execute-action",
            json!({"id": "page1/btn-1-0", "actionType": "application", "actionValue": "chrome.exe"}),
        );
        let (status, body) = call(app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["status"], "success");

        let expected = FeedbackEvent::success(ButtonId::from("page1/btn-1-0"), "ran chrome.exe");
        assert_eq!(
            recv_frames(&mut rx),
            vec![ServerMessage::Event(BroadcastEvent::ButtonFeedback(expected))]
        );
    }

    #[tokio::test]
    async fn test_execute_widget_is_unprocessable() {
        let app = app_state();
        let req = post_json(
            "/api/execute-action",
            json!({"id": "page1/btn-2-0", "actionType": "widget"}),
        );
        let (status, body) = call(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid-intent");
        assert_eq!(app.coordinator.events_published(), 0);
    }
}
