// In-memory session registry, write-through to the store.
//
// The map is the source of truth while the process runs; the store exists so
// sessions survive restarts. Persistence happens on a spawned task after the
// in-memory mutation, so a slow or dead database never blocks a request.
// Failures are logged inside the store.
//
// Concurrent invocations against the same session_id race on
// thread_id/token/last_invoke_at with last-writer-wins semantics. That is
// accepted: the reuse decision converges on the next invocation either way,
// and serializing all sessions globally would cost more than it buys.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use playground_core::{ids, Message, Session, SessionSummary};

use crate::session_store::{newest_first, SessionStore};

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    store: SessionStore,
}

impl SessionRegistry {
    /// Warm the registry from whatever the store still holds.
    pub async fn load(store: SessionStore) -> Self {
        let persisted = store.get_all().await;
        if !persisted.is_empty() {
            tracing::info!(count = persisted.len(), "recovered persisted sessions");
        }
        let sessions = persisted
            .into_iter()
            .map(|s| (s.session_id.clone(), s))
            .collect();
        Self {
            sessions: RwLock::new(sessions),
            store,
        }
    }

    pub async fn create(
        &self,
        agent_name: String,
        namespace: String,
        title: String,
        session_timeout_ms: i64,
    ) -> Session {
        let session = Session::new(
            ids::mint_session_id(),
            agent_name,
            namespace,
            title,
            session_timeout_ms,
        );
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        self.persist(session.clone());
        session
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return Some(session.clone());
        }
        // Cache miss: the store may still know it (e.g. written before a
        // restart that raced the warm load).
        let session = self.store.get(session_id).await?;
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        Some(session)
    }

    /// Summaries of all sessions, most recently created first.
    pub async fn list_summaries(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .await
            .values()
            .map(Session::summary)
            .collect();
        summaries.sort_by(|a, b| newest_first(&a.created_at, &b.created_at));
        summaries
    }

    /// Append a message; returns false when the session does not exist.
    pub async fn append_message(&self, session_id: &str, message: Message) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return false;
        };
        session.push_message(message);
        let snapshot = session.clone();
        drop(sessions);
        self.persist(snapshot);
        true
    }

    /// Fold a successful invocation back into the session, if it still exists.
    pub async fn record_invocation(
        &self,
        session_id: &str,
        thread_id: &str,
        agentcube_session_id: Option<String>,
    ) {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return;
        };
        if let Some(token) = &agentcube_session_id {
            tracing::info!(session_id, token = %token, "stored agentcube session token");
        }
        session.record_invocation(thread_id.to_string(), agentcube_session_id, Utc::now());
        let snapshot = session.clone();
        drop(sessions);
        self.persist(snapshot);
    }

    /// Delete a session; returns false when it does not exist.
    pub async fn delete(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            let store = self.store.clone();
            let session_id = session_id.to_string();
            tokio::spawn(async move { store.delete(&session_id).await });
        }
        removed
    }

    /// Hand the snapshot to the store off the request path.
    fn persist(&self, session: Session) {
        let store = self.store.clone();
        tokio::spawn(async move { store.save(&session).await });
    }
}
