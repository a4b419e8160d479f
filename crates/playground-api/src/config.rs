// Environment-driven configuration. Everything has a loopback or disabled
// default so a bare `cargo run` comes up against local port-forwards.

use axum::http::HeaderValue;

const IN_CLUSTER_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the beacon event gateway (upstream SSE feed).
    pub beacon_url: String,
    /// Base URL of the agentcube router (invocation endpoint).
    pub router_url: String,
    /// Base URL of the cluster directory API. Defaults to a kubectl proxy.
    pub kube_api_url: String,
    /// Bearer token file for the cluster directory; missing file means
    /// unauthenticated requests.
    pub kube_token_path: String,
    /// Postgres connection string; absent disables persistence.
    pub pg_conn: Option<String>,
    pub bind_addr: String,
    pub cors_origins: Vec<HeaderValue>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            beacon_url: env_or("BEACON_URL", "http://127.0.0.1:28082"),
            router_url: env_or("AGENTCUBE_ROUTER_URL", "http://localhost:18081"),
            kube_api_url: env_or("KUBE_API_URL", "http://127.0.0.1:8001"),
            kube_token_path: env_or("KUBE_TOKEN_PATH", IN_CLUSTER_TOKEN_PATH),
            pg_conn: std::env::var("PG_CONN").ok().filter(|s| !s.is_empty()),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
            cors_origins: parse_cors_origins(
                &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
            ),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_cors_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}
