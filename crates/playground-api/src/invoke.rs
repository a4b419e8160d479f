// Invocation orchestration.
//
// One invocation: resolve the session, decide whether the warm pod token is
// still valid, mint any missing identifiers, call the router, then fold the
// returned thread id and fresh token back into the session. The outbound
// call carries its own 120s deadline, unrelated to the session idle timeout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use playground_core::{ids, InvokeRequest, InvokeResponse};

use crate::error::{ApiError, InvokeError};
use crate::AppState;

/// Header carrying the agentcube reuse token in both directions.
pub const REUSE_TOKEN_HEADER: &str = "x-agentcube-session-id";

const INVOKE_TIMEOUT: Duration = Duration::from_secs(120);

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/invoke", post(invoke_agent))
        .with_state(state)
}

/// HTTP client for the agentcube router's per-agent invocation endpoint.
pub struct AgentInvoker {
    client: reqwest::Client,
    base_url: String,
}

/// What a successful router call yields after interpretation.
#[derive(Debug)]
pub struct RouterReply {
    pub thread_id: String,
    pub agentcube_session_id: Option<String>,
    pub output: Option<String>,
    pub agent: Option<String>,
    pub timestamp: Option<String>,
}

impl AgentInvoker {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(INVOKE_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST the prompt to the router, attaching the reuse token when given.
    pub async fn run_command(
        &self,
        agent_name: &str,
        namespace: &str,
        prompt: &str,
        thread_id: &str,
        turn_id: &str,
        reuse_token: Option<&str>,
    ) -> Result<RouterReply, InvokeError> {
        let url = format!(
            "{}/v1/namespaces/{}/agent-runtimes/{}/invocations/runcmd",
            self.base_url, namespace, agent_name
        );
        let body = json!({
            "payload": {
                "prompt": prompt,
                "thread_id": thread_id,
                "turn_id": turn_id,
            }
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = reuse_token {
            request = request.header(REUSE_TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        let returned_token = response
            .headers()
            .get(REUSE_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        interpret_response(status, returned_token, &body)
    }
}

/// Turn a raw router response into a reply or the right failure.
///
/// Non-2xx passes the upstream status and body through untouched. A 2xx
/// without a thread_id is a contract violation, not something to patch over.
fn interpret_response(
    status: StatusCode,
    returned_token: Option<String>,
    body: &str,
) -> Result<RouterReply, InvokeError> {
    if !status.is_success() {
        return Err(InvokeError::Upstream {
            status,
            body: body.to_string(),
        });
    }

    let result: Value =
        serde_json::from_str(body).map_err(|e| InvokeError::InvalidResponse(e.to_string()))?;

    let thread_id = result["thread_id"].as_str().unwrap_or_default();
    if thread_id.is_empty() {
        return Err(InvokeError::MissingThreadId);
    }

    Ok(RouterReply {
        thread_id: thread_id.to_string(),
        agentcube_session_id: returned_token,
        output: result["output"].as_str().map(String::from),
        agent: result["agent"].as_str().map(String::from),
        timestamp: result["timestamp"].as_str().map(String::from),
    })
}

/// Caller-supplied thread wins, then the session's stored one, then a fresh
/// mint. Fresh ids are per-call; nothing is ever shared across sessions.
fn resolve_thread_id(
    explicit: Option<&str>,
    session_thread: Option<&str>,
    now: chrono::DateTime<Utc>,
) -> String {
    if let Some(thread_id) = explicit.or(session_thread) {
        tracing::info!(thread_id, "reusing thread id");
        return thread_id.to_string();
    }
    let minted = ids::mint_thread_id(now);
    tracing::info!(thread_id = %minted, "minted new thread id");
    minted
}

/// POST /api/invoke
pub async fn invoke_agent(
    State(state): State<AppState>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, ApiError> {
    let now = Utc::now();

    let session = match &req.session_id {
        Some(session_id) => state.registry.get(session_id).await,
        None => None,
    };

    let reuse_token = session
        .as_ref()
        .and_then(|s| s.reusable_token(now))
        .map(String::from);
    match (&session, &reuse_token) {
        (Some(s), Some(token)) => {
            tracing::info!(session_id = %s.session_id, token = %token, "reusing agentcube session")
        }
        (Some(s), None) if s.agentcube_session_id.is_some() => {
            tracing::info!(session_id = %s.session_id, "agentcube session expired, a new one will be created")
        }
        _ => tracing::info!("no agentcube session found, a new one will be created"),
    }

    let thread_id = resolve_thread_id(
        req.thread_id.as_deref(),
        session.as_ref().and_then(|s| s.thread_id.as_deref()),
        now,
    );
    let turn_id = req.turn_id.clone().unwrap_or_else(ids::mint_turn_id);

    tracing::info!(
        agent = %req.agent_name,
        namespace = %req.namespace,
        thread_id = %thread_id,
        "invoking agent"
    );

    let reply = state
        .invoker
        .run_command(
            &req.agent_name,
            &req.namespace,
            &req.prompt,
            &thread_id,
            &turn_id,
            reuse_token.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(agent = %req.agent_name, error = %e, "agent invocation failed");
            e
        })?;

    if let Some(session) = &session {
        state
            .registry
            .record_invocation(
                &session.session_id,
                &reply.thread_id,
                reply.agentcube_session_id.clone(),
            )
            .await;
    }

    Ok(Json(InvokeResponse {
        thread_id: reply.thread_id,
        turn_id: Some(turn_id),
        agentcube_session_id: reply.agentcube_session_id.or(reuse_token),
        output: reply.output,
        agent: reply.agent,
        timestamp: reply.timestamp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_passes_status_and_body_through() {
        let err = interpret_response(StatusCode::SERVICE_UNAVAILABLE, None, "no pods").unwrap_err();
        match err {
            InvokeError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "no pods");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_thread_id_is_a_hard_error() {
        let err =
            interpret_response(StatusCode::OK, None, r#"{"output": "hi"}"#).unwrap_err();
        assert!(matches!(err, InvokeError::MissingThreadId));

        let err =
            interpret_response(StatusCode::OK, None, r#"{"thread_id": ""}"#).unwrap_err();
        assert!(matches!(err, InvokeError::MissingThreadId));
    }

    #[test]
    fn unparseable_success_body_is_invalid_response() {
        let err = interpret_response(StatusCode::OK, None, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, InvokeError::InvalidResponse(_)));
    }

    #[test]
    fn successful_reply_carries_token_and_fields() {
        let reply = interpret_response(
            StatusCode::OK,
            Some("pod-42".into()),
            r#"{"thread_id": "thread_1", "output": "done", "agent": "research", "timestamp": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(reply.thread_id, "thread_1");
        assert_eq!(reply.agentcube_session_id.as_deref(), Some("pod-42"));
        assert_eq!(reply.output.as_deref(), Some("done"));
        assert_eq!(reply.agent.as_deref(), Some("research"));
        assert_eq!(reply.timestamp.as_deref(), Some("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn thread_resolution_prefers_caller_then_session_then_mints() {
        let now = Utc::now();
        assert_eq!(
            resolve_thread_id(Some("thread_explicit"), Some("thread_session"), now),
            "thread_explicit"
        );
        assert_eq!(
            resolve_thread_id(None, Some("thread_session"), now),
            "thread_session"
        );
        let minted = resolve_thread_id(None, None, now);
        assert!(minted.starts_with("thread_"));
        assert_ne!(minted, resolve_thread_id(None, None, now));
    }

    #[test]
    fn token_absence_leaves_reply_token_empty() {
        let reply =
            interpret_response(StatusCode::OK, None, r#"{"thread_id": "thread_1"}"#).unwrap();
        assert!(reply.agentcube_session_id.is_none());
        assert!(reply.output.is_none());
    }
}
