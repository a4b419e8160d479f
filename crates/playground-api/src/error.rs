// Error taxonomy for client-facing calls.
//
// Only two things may fail an invocation: the upstream breaking the
// telemetry contract (missing thread_id) and upstream transport/HTTP
// failures. Everything else in the system degrades to defaults.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokeError {
    /// The agent replied 2xx but without a thread_id, so its events cannot
    /// be streamed. Hard error, never papered over with a synthesized id.
    #[error("agent did not return a thread_id; it likely does not support event telemetry")]
    MissingThreadId,

    /// Non-2xx from the router, passed through with the original detail.
    #[error("agent router returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    /// 2xx with a body that is not the expected JSON shape.
    #[error("invalid response from agent router: {0}")]
    InvalidResponse(String),

    #[error("failed to reach agent router: {0}")]
    Transport(#[from] reqwest::Error),
}

/// JSON error response in the `{"detail": ...}` shape clients expect.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<InvokeError> for ApiError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::MissingThreadId => Self {
                status: StatusCode::BAD_REQUEST,
                detail: err.to_string(),
            },
            InvokeError::Upstream { status, body } => Self {
                status,
                detail: body,
            },
            InvokeError::InvalidResponse(_) | InvokeError::Transport(_) => Self {
                status: StatusCode::BAD_GATEWAY,
                detail: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_thread_id_maps_to_400() {
        let api: ApiError = InvokeError::MissingThreadId.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.detail.contains("thread_id"));
    }

    #[test]
    fn upstream_status_passes_through() {
        let api: ApiError = InvokeError::Upstream {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "rate limited".into(),
        }
        .into();
        assert_eq!(api.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(api.detail, "rate limited");
    }

    #[test]
    fn malformed_upstream_body_maps_to_502() {
        let api: ApiError = InvokeError::InvalidResponse("not json".into()).into();
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
    }
}
