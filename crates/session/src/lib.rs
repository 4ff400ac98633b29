//! Session continuity storage: the external collaborator spec.md names as
//! "cookie-backed session storage", keyed by the opaque cookie id the HTTP
//! layer issues and reads via `axum-extra`'s cookie jar.

use std::collections::HashMap;

use async_trait::async_trait;
use gateway_types::UserContinuity;
use tokio::sync::RwLock;

/// Idle expiry for a session's continuity (§6 "20-minute idle expiry").
pub const IDLE_WINDOW_SECS: i64 = 20 * 60;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` if the session is unknown or its last turn is older
    /// than [`IDLE_WINDOW_SECS`].
    async fn get(&self, session_id: &str, now: i64) -> Option<UserContinuity>;
    async fn set(&self, session_id: &str, continuity: UserContinuity);
    async fn clear(&self, session_id: &str);
}

/// Process-local default: one continuity record per session id.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, UserContinuity>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str, now: i64) -> Option<UserContinuity> {
        let mut entries = self.entries.write().await;
        match entries.get(session_id) {
            Some(continuity) if now - continuity.last_time <= IDLE_WINDOW_SECS => Some(continuity.clone()),
            Some(_) => {
                entries.remove(session_id);
                None
            }
            None => None,
        }
    }

    async fn set(&self, session_id: &str, continuity: UserContinuity) {
        self.entries.write().await.insert(session_id.to_string(), continuity);
    }

    async fn clear(&self, session_id: &str) {
        self.entries.write().await.remove(session_id);
    }
}
