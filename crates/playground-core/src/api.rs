// Public API DTOs shared between handlers and clients.

use serde::{Deserialize, Serialize};

use crate::session::{SessionSummary, DEFAULT_TITLE};

/// One agent runtime as reported by the cluster directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub namespace: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListResponse {
    pub agents: Vec<AgentInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    pub agent_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub prompt: String,
    /// Playground session to resolve reuse tokens and thread ids from.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Explicit thread to continue; minted when absent.
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub turn_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub thread_id: String,
    #[serde(default)]
    pub turn_id: Option<String>,
    /// Runtime token for warm-pod reuse on the next invocation.
    #[serde(default)]
    pub agentcube_session_id: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub agent_name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

/// `{"ok": true}` acknowledgement for mutations without a body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}
