// Identifier minting for sessions, threads and turns.
//
// Thread ids embed a timestamp so they sort by creation time in logs and
// dashboards; the random suffix keeps them unique within one second.

use chrono::{DateTime, Utc};
use uuid::Uuid;

fn short_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Opaque short session id, e.g. `3f9c01ab`.
pub fn mint_session_id() -> String {
    short_suffix()
}

/// Human-sortable thread id, e.g. `thread_20250117093042_3f9c01ab`.
pub fn mint_thread_id(now: DateTime<Utc>) -> String {
    format!("thread_{}_{}", now.format("%Y%m%d%H%M%S"), short_suffix())
}

/// Per-invocation turn id, e.g. `turn_3f9c01ab`.
pub fn mint_turn_id() -> String {
    format!("turn_{}", short_suffix())
}
