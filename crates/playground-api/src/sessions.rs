// Session CRUD and message appends.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use playground_core::{
    AckResponse, CreateSessionRequest, Message, Session, SessionListResponse,
};

use crate::directory::AgentCatalog;
use crate::error::ApiError;
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/:session_id",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/:session_id/messages", post(add_message))
        .with_state(state)
}

/// GET /api/sessions - all sessions, most recently created first.
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.registry.list_summaries().await,
    })
}

/// POST /api/sessions - create a session, resolving the agent's configured
/// timeout through the cluster directory exactly once.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> (StatusCode, Json<Session>) {
    let timeout_ms = state
        .catalog
        .session_timeout_ms(&req.agent_name, &req.namespace)
        .await;

    let session = state
        .registry
        .create(req.agent_name, req.namespace, req.title, timeout_ms)
        .await;
    tracing::info!(
        session_id = %session.session_id,
        timeout_ms,
        "created session"
    );
    (StatusCode::CREATED, Json(session))
}

/// GET /api/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    state
        .registry
        .get(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

/// POST /api/sessions/{session_id}/messages
pub async fn add_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(message): Json<Message>,
) -> Result<Json<AckResponse>, ApiError> {
    if state.registry.append_message(&session_id, message).await {
        Ok(Json(AckResponse::ok()))
    } else {
        Err(ApiError::not_found("Session not found"))
    }
}

/// DELETE /api/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AckResponse>, ApiError> {
    if state.registry.delete(&session_id).await {
        tracing::info!(session_id = %session_id, "deleted session");
        Ok(Json(AckResponse::ok()))
    } else {
        Err(ApiError::not_found("Session not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn empty_registry_lists_no_sessions() {
        let app = routes(test_state().await);
        let response = app
            .oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "sessions": [] }));
    }

    #[tokio::test]
    async fn create_get_delete_lifecycle() {
        let state = test_state().await;
        let app = routes(state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/api/sessions", json!({ "agent_name": "research" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let session = body_json(response).await;
        assert_eq!(session["agent_name"], "research");
        assert_eq!(session["namespace"], "default");
        assert_eq!(session["title"], "New Chat");
        // timeout resolved through the stub catalog
        assert_eq!(session["session_timeout_ms"], 900_000);
        let id = session["session_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "ok": true }));

        let response = app
            .oneshot(
                Request::get(format!("/api/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn message_append_sets_title_and_missing_session_is_404() {
        let state = test_state().await;
        let app = routes(state.clone());

        let response = app
            .clone()
            .oneshot(post_json("/api/sessions", json!({ "agent_name": "research" })))
            .await
            .unwrap();
        let id = body_json(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/sessions/{id}/messages"),
                json!({
                    "role": "user",
                    "content": "summarize the incident report",
                    "thread_id": "thread_20250101000000_deadbeef",
                    "events": [
                        { "event_id": "e1", "seq": 1, "type": "llm.delta", "payload": { "text": "hi" } }
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "ok": true }));

        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let session = body_json(response).await;
        assert_eq!(session["title"], "summarize the incident report");
        assert_eq!(session["messages"].as_array().unwrap().len(), 1);
        // thread id backfilled from the message, event envelope preserved
        assert_eq!(session["thread_id"], "thread_20250101000000_deadbeef");
        assert_eq!(session["messages"][0]["events"][0]["type"], "llm.delta");

        let response = app
            .oneshot(post_json(
                "/api/sessions/nope/messages",
                json!({ "role": "user", "content": "hi" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "detail": "Session not found" })
        );
    }

    #[tokio::test]
    async fn stub_catalog_answers_timeout_without_a_cluster() {
        let state = test_state().await;
        assert_eq!(state.catalog.session_timeout_ms("any", "default").await, 900_000);
    }
}
