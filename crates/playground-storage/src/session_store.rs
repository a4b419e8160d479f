// Postgres-backed session snapshots.
//
// Sessions are stored whole as JSONB keyed by session_id, with created_at
// denormalized for ordering. Every operation swallows backend failures and
// returns a safe default: losing a write is acceptable for a conversational
// UX tool, taking the orchestrator down is not. With no connection string
// configured the store is a warned-once no-op.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use playground_core::Session;

#[derive(Clone)]
pub struct SessionStore {
    pool: Option<PgPool>,
}

impl SessionStore {
    /// Build the store from an optional connection string. The pool is lazy:
    /// construction never blocks and never fails, an unreachable database
    /// shows up as per-operation errors instead.
    pub fn connect(conn_str: Option<&str>) -> Self {
        let pool = match conn_str {
            Some(url) => match PgPoolOptions::new().connect_lazy(url) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::error!(error = %e, "invalid Postgres connection string, persistence disabled");
                    None
                }
            },
            None => {
                tracing::warn!("PG_CONN is not set, sessions will not be persisted");
                None
            }
        };
        Self { pool }
    }

    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    /// Idempotent schema initialization. Failure is logged, not propagated.
    pub async fn init_schema(&self) {
        let Some(pool) = &self.pool else { return };
        let result = sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await;

        if let Err(e) = result {
            tracing::error!(error = %e, "failed to initialize sessions table");
        }
    }

    /// Upsert the full session snapshot.
    pub async fn save(&self, session: &Session) {
        let Some(pool) = &self.pool else { return };
        let data = match serde_json::to_value(session) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(session_id = %session.session_id, error = %e, "failed to serialize session");
                return;
            }
        };

        let result = sqlx::query(
            r#"
            INSERT INTO sessions (session_id, created_at, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id) DO UPDATE SET
                created_at = EXCLUDED.created_at,
                data = EXCLUDED.data
            "#,
        )
        .bind(&session.session_id)
        .bind(session.created_at)
        .bind(&data)
        .execute(pool)
        .await;

        if let Err(e) = result {
            tracing::error!(session_id = %session.session_id, error = %e, "failed to save session");
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let Some(pool) = &self.pool else { return None };
        let row: Result<Option<serde_json::Value>, _> =
            sqlx::query_scalar("SELECT data FROM sessions WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(pool)
                .await;

        match row {
            Ok(Some(data)) => match serde_json::from_value(data) {
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::error!(session_id, error = %e, "stored session failed to deserialize");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!(session_id, error = %e, "failed to fetch session");
                None
            }
        }
    }

    /// All sessions, newest created first.
    pub async fn get_all(&self) -> Vec<Session> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        let rows: Result<Vec<serde_json::Value>, _> =
            sqlx::query_scalar("SELECT data FROM sessions ORDER BY created_at DESC")
                .fetch_all(pool)
                .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|data| match serde_json::from_value(data) {
                    Ok(session) => Some(session),
                    Err(e) => {
                        tracing::error!(error = %e, "skipping undeserializable session row");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "failed to list sessions");
                Vec::new()
            }
        }
    }

    pub async fn delete(&self, session_id: &str) {
        let Some(pool) = &self.pool else { return };
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(pool)
            .await;

        if let Err(e) = result {
            tracing::error!(session_id, error = %e, "failed to delete session");
        }
    }
}

// Referenced by the registry when sorting in-memory summaries the same way
// the SQL ordering does.
pub(crate) fn newest_first(a: &DateTime<Utc>, b: &DateTime<Utc>) -> std::cmp::Ordering {
    b.cmp(a)
}
