// Agent listing backed by the cluster directory.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use playground_core::AgentListResponse;

use crate::directory::AgentCatalog;
use crate::error::ApiError;
use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .with_state(state)
}

/// GET /api/agents - agent runtimes visible in the cluster.
pub async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<AgentListResponse>, ApiError> {
    let agents = state.catalog.list_agents().await.map_err(|e| {
        tracing::error!(error = %e, "failed to list agents");
        ApiError::internal(e.to_string())
    })?;
    Ok(Json(AgentListResponse { agents }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn lists_agents_from_the_catalog() {
        let app = super::routes(test_state().await);
        let response = app
            .oneshot(Request::get("/api/agents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["agents"][0]["name"], "research");
        assert_eq!(body["agents"][0]["status"], "Ready");
    }
}
