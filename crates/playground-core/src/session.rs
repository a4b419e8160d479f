// Session, Message and AgentEvent model.
//
// A Session binds one client conversation to one agent and (optionally) one
// reusable warm compute unit on the agentcube side. The invocation path is
// the only writer of thread_id / last_invoke_at / agentcube_session_id; the
// event relay never touches session state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title used until the first user message comes in.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Titles derived from the first user message are cut at this many characters.
const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One event from the agent execution trace, attached to a message for
/// replay. The envelope is opaque to the orchestrator; `seq` is assigned by
/// the remote gateway, never here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub turn_id: String,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub ts: String,
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "empty_object")]
    pub payload: Value,
}

fn default_level() -> String {
    "info".to_string()
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// One conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub events: Vec<AgentEvent>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub agent_name: String,
    pub namespace: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub session_timeout_ms: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Reuse token for the warm agentcube execution pod. Overwritten when an
    /// invocation returns a fresh one; never cleared, only aged out.
    #[serde(default)]
    pub agentcube_session_id: Option<String>,
    #[serde(default)]
    pub last_invoke_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        session_id: String,
        agent_name: String,
        namespace: String,
        title: String,
        session_timeout_ms: i64,
    ) -> Self {
        Self {
            session_id,
            thread_id: None,
            agent_name,
            namespace,
            title,
            created_at: Utc::now(),
            session_timeout_ms,
            messages: Vec::new(),
            agentcube_session_id: None,
            last_invoke_at: None,
        }
    }

    /// Whether the warm compute session can no longer be reused.
    ///
    /// A session with no token or no recorded invocation counts as expired;
    /// otherwise reuse is valid while `now <= last_invoke_at + timeout`.
    pub fn is_compute_session_expired(&self, now: DateTime<Utc>) -> bool {
        let (Some(_), Some(last)) = (&self.agentcube_session_id, self.last_invoke_at) else {
            return true;
        };
        now > last + Duration::milliseconds(self.session_timeout_ms)
    }

    /// The reuse token to attach to an outbound invocation, if still valid.
    pub fn reusable_token(&self, now: DateTime<Utc>) -> Option<&str> {
        if self.is_compute_session_expired(now) {
            None
        } else {
            self.agentcube_session_id.as_deref()
        }
    }

    /// Apply the result of a successful invocation. A missing token leaves
    /// the stored one untouched so a still-valid pod keeps being reused.
    pub fn record_invocation(
        &mut self,
        thread_id: String,
        token: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.thread_id = Some(thread_id);
        self.last_invoke_at = Some(now);
        if let Some(token) = token {
            self.agentcube_session_id = Some(token);
        }
    }

    /// Append a message, backfilling the session thread id from the message
    /// and deriving the title from the first user message.
    pub fn push_message(&mut self, message: Message) {
        if self.thread_id.is_none() {
            if let Some(thread_id) = &message.thread_id {
                self.thread_id = Some(thread_id.clone());
            }
        }
        let derive = self.messages.is_empty() && message.role == MessageRole::User;
        if derive {
            self.title = derive_title(&message.content);
        }
        self.messages.push(message);
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            thread_id: self.thread_id.clone(),
            agent_name: self.agent_name.clone(),
            namespace: self.namespace.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            session_timeout_ms: self.session_timeout_ms,
            agentcube_session_id: self.agentcube_session_id.clone(),
            last_invoke_at: self.last_invoke_at,
            message_count: self.messages.len(),
        }
    }
}

/// List-endpoint projection of a session, without the message bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub thread_id: Option<String>,
    pub agent_name: String,
    pub namespace: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub session_timeout_ms: i64,
    pub agentcube_session_id: Option<String>,
    pub last_invoke_at: Option<DateTime<Utc>>,
    pub message_count: usize,
}

fn derive_title(content: &str) -> String {
    let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        format!("{truncated}...")
    } else {
        truncated
    }
}
