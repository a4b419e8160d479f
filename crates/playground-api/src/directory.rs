// Cluster directory adapter.
//
// The directory is a plain HTTP view of the Kubernetes API (in-cluster
// service endpoint or a kubectl proxy). Resource-kind discovery runs once
// per process through a lazily-initialized cell: concurrent first callers
// share one in-flight lookup, and a failed discovery pins the well-known
// default triple instead of failing agent listings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

use playground_core::{parse_duration_ms, AgentInfo, DEFAULT_SESSION_TIMEOUT_MS};

const AGENT_RUNTIME_KIND: &str = "AgentRuntime";
const CRD_LIST_PATH: &str = "/apis/apiextensions.k8s.io/v1/customresourcedefinitions";
const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(30);

/// group/version/plural triple identifying the agent runtime resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKind {
    pub group: String,
    pub version: String,
    pub plural: String,
}

impl ResourceKind {
    fn fallback() -> Self {
        Self {
            group: "agentcube.io".into(),
            version: "v1alpha1".into(),
            plural: "agentruntimes".into(),
        }
    }
}

/// Read surface of the cluster directory.
#[async_trait]
pub trait AgentCatalog: Send + Sync {
    /// All agent runtimes visible in the cluster.
    async fn list_agents(&self) -> Result<Vec<AgentInfo>>;

    /// The named agent's configured session timeout in milliseconds.
    /// Never fails: any problem resolves to the 10-minute default.
    async fn session_timeout_ms(&self, agent_name: &str, namespace: &str) -> i64;
}

pub struct KubeDirectory {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    kind: OnceCell<ResourceKind>,
}

impl KubeDirectory {
    pub fn new(base_url: &str, token_path: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DIRECTORY_TIMEOUT)
            .build()
            .context("failed to build directory HTTP client")?;

        let bearer_token = match std::fs::read_to_string(token_path) {
            Ok(token) => Some(token.trim().to_string()),
            Err(e) => {
                tracing::warn!(path = token_path, error = %e, "no cluster credentials, directory requests are unauthenticated");
                None
            }
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token,
            kind: OnceCell::new(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("directory request to {path} failed"))?
            .error_for_status()
            .with_context(|| format!("directory request to {path} rejected"))?;
        response
            .json()
            .await
            .with_context(|| format!("directory response from {path} was not JSON"))
    }

    /// Resolved resource kind, discovered once and cached for the process.
    async fn resource_kind(&self) -> &ResourceKind {
        self.kind
            .get_or_init(|| async {
                match self.discover_kind().await {
                    Ok(kind) => {
                        tracing::info!(group = %kind.group, version = %kind.version, plural = %kind.plural, "discovered agent runtime resource kind");
                        kind
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "resource kind discovery failed, using default");
                        ResourceKind::fallback()
                    }
                }
            })
            .await
    }

    async fn discover_kind(&self) -> Result<ResourceKind> {
        let crds = self.get_json(CRD_LIST_PATH).await?;
        select_agent_runtime_kind(&crds)
            .with_context(|| format!("no CRD with kind {AGENT_RUNTIME_KIND} found"))
    }
}

#[async_trait]
impl AgentCatalog for KubeDirectory {
    async fn list_agents(&self) -> Result<Vec<AgentInfo>> {
        let kind = self.resource_kind().await;
        let path = format!("/apis/{}/{}/{}", kind.group, kind.version, kind.plural);
        let data = self.get_json(&path).await?;

        let agents = data["items"]
            .as_array()
            .map(|items| items.iter().map(agent_info).collect())
            .unwrap_or_default();
        Ok(agents)
    }

    async fn session_timeout_ms(&self, agent_name: &str, namespace: &str) -> i64 {
        let kind = self.resource_kind().await;
        let path = format!(
            "/apis/{}/{}/namespaces/{}/{}/{}",
            kind.group, kind.version, namespace, kind.plural, agent_name
        );
        match self.get_json(&path).await {
            Ok(resource) => {
                let configured = resource["spec"]["sessionTimeout"].as_str().unwrap_or("10m");
                tracing::info!(agent = agent_name, timeout = configured, "resolved agent session timeout");
                parse_duration_ms(configured)
            }
            Err(e) => {
                tracing::warn!(agent = agent_name, error = %e, "failed to read agent session timeout, using default 10m");
                DEFAULT_SESSION_TIMEOUT_MS
            }
        }
    }
}

/// Pick the served+storage version of the AgentRuntime CRD out of a CRD list.
fn select_agent_runtime_kind(crds: &Value) -> Option<ResourceKind> {
    let items = crds["items"].as_array()?;
    let crd = items
        .iter()
        .find(|crd| crd["spec"]["names"]["kind"].as_str() == Some(AGENT_RUNTIME_KIND))?;

    let spec = &crd["spec"];
    let versions = spec["versions"].as_array()?;
    let version = versions
        .iter()
        .find(|v| {
            v["served"].as_bool().unwrap_or(false) && v["storage"].as_bool().unwrap_or(false)
        })
        .or_else(|| versions.first())
        .and_then(|v| v["name"].as_str())?;

    Some(ResourceKind {
        group: spec["group"].as_str()?.to_string(),
        version: version.to_string(),
        plural: spec["names"]["plural"].as_str()?.to_string(),
    })
}

/// Project one directory item into the public agent shape. Status prefers an
/// explicit phase, then falls back to the latest reported condition type.
fn agent_info(item: &Value) -> AgentInfo {
    AgentInfo {
        name: item["metadata"]["name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
        namespace: item["metadata"]["namespace"]
            .as_str()
            .unwrap_or("default")
            .to_string(),
        status: derive_status(item),
        created_at: item["metadata"]["creationTimestamp"]
            .as_str()
            .map(String::from),
    }
}

fn derive_status(item: &Value) -> String {
    let phase = item["status"]["phase"].as_str().unwrap_or("Unknown");
    if phase != "Unknown" {
        return phase.to_string();
    }
    item["status"]["conditions"]
        .as_array()
        .and_then(|conditions| conditions.last())
        .and_then(|condition| condition["type"].as_str())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_served_storage_version() {
        let crds = json!({
            "items": [
                { "spec": { "group": "other.io", "names": { "kind": "Widget", "plural": "widgets" },
                            "versions": [{ "name": "v1", "served": true, "storage": true }] } },
                { "spec": { "group": "agentcube.io", "names": { "kind": "AgentRuntime", "plural": "agentruntimes" },
                            "versions": [
                                { "name": "v1alpha1", "served": true, "storage": false },
                                { "name": "v1beta1", "served": true, "storage": true }
                            ] } }
            ]
        });
        let kind = select_agent_runtime_kind(&crds).unwrap();
        assert_eq!(kind.group, "agentcube.io");
        assert_eq!(kind.version, "v1beta1");
        assert_eq!(kind.plural, "agentruntimes");
    }

    #[test]
    fn falls_back_to_first_version_when_none_is_storage() {
        let crds = json!({
            "items": [
                { "spec": { "group": "agentcube.io", "names": { "kind": "AgentRuntime", "plural": "agentruntimes" },
                            "versions": [{ "name": "v1alpha1", "served": false, "storage": false }] } }
            ]
        });
        let kind = select_agent_runtime_kind(&crds).unwrap();
        assert_eq!(kind.version, "v1alpha1");
    }

    #[test]
    fn missing_crd_yields_none() {
        assert!(select_agent_runtime_kind(&json!({ "items": [] })).is_none());
        assert!(select_agent_runtime_kind(&json!({})).is_none());
    }

    #[test]
    fn status_prefers_phase() {
        let item = json!({ "status": { "phase": "Ready", "conditions": [{ "type": "Pending" }] } });
        assert_eq!(derive_status(&item), "Ready");
    }

    #[test]
    fn status_falls_back_to_last_condition() {
        let item = json!({ "status": { "phase": "Unknown",
                                       "conditions": [{ "type": "Scheduled" }, { "type": "Ready" }] } });
        assert_eq!(derive_status(&item), "Ready");
    }

    #[test]
    fn status_defaults_to_unknown() {
        assert_eq!(derive_status(&json!({})), "Unknown");
        assert_eq!(derive_status(&json!({ "status": { "conditions": [] } })), "Unknown");
    }

    #[test]
    fn agent_info_projects_metadata() {
        let item = json!({
            "metadata": { "name": "research", "namespace": "prod", "creationTimestamp": "2025-01-01T00:00:00Z" },
            "status": { "phase": "Ready" }
        });
        let info = agent_info(&item);
        assert_eq!(info.name, "research");
        assert_eq!(info.namespace, "prod");
        assert_eq!(info.status, "Ready");
        assert_eq!(info.created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
    }
}
