// Playground orchestrator API server.
//
// Sits between the chat UI and the agentcube fleet: tracks sessions, decides
// warm-pod reuse, invokes agents through the router, and relays the beacon
// event feed. Upstream collaborators (router, beacon, cluster directory,
// Postgres) are all optional at boot; missing ones degrade per endpoint.

mod agents;
mod config;
mod directory;
mod error;
mod invoke;
mod sessions;
mod stream;

use anyhow::{Context, Result};
use axum::http::{header, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playground_storage::{SessionRegistry, SessionStore};

use crate::config::Config;
use crate::directory::{AgentCatalog, KubeDirectory};
use crate::invoke::AgentInvoker;
use crate::stream::EventFeed;

/// App state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub catalog: Arc<dyn AgentCatalog>,
    pub invoker: Arc<AgentInvoker>,
    pub feed: EventFeed,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playground_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        beacon = %config.beacon_url,
        router = %config.router_url,
        "playground backend starting"
    );

    let store = SessionStore::connect(config.pg_conn.as_deref());
    store.init_schema().await;
    let registry = Arc::new(SessionRegistry::load(store).await);

    let catalog: Arc<dyn AgentCatalog> = Arc::new(
        KubeDirectory::new(&config.kube_api_url, &config.kube_token_path)
            .context("failed to build cluster directory adapter")?,
    );
    let invoker = Arc::new(
        AgentInvoker::new(&config.router_url).context("failed to build router client")?,
    );
    let feed = EventFeed::new(&config.beacon_url);

    let state = AppState {
        registry,
        catalog,
        invoker,
        feed,
    };

    let app = build_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn build_router(state: AppState, cors_origins: &[axum::http::HeaderValue]) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .merge(agents::routes(state.clone()))
        .merge(invoke::routes(state.clone()))
        .merge(sessions::routes(state.clone()))
        .merge(stream::routes(state));

    let app = if cors_origins.is_empty() {
        app
    } else {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins.to_vec()))
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
                .allow_credentials(true),
        )
    };

    app.layer(TraceLayer::new_for_http())
}


#[cfg(test)]
mod tests {
    use super::test_support::test_state;
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_ok() {
        let app = build_router(test_state().await, &[]);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unreachable_router_surfaces_as_bad_gateway() {
        let app = build_router(test_state().await, &[]);
        let response = app
            .oneshot(
                Request::post("/api/invoke")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"agent_name": "research", "prompt": "hi"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
