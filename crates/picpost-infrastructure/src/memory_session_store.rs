//! In-memory, TTL-bearing session store.
//!
//! Records live in a process-local map keyed by thread id. Expiry is evaluated lazily on
//! read against the injected clock; an expired record behaves exactly like a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picpost_core::clock::Clock;
use picpost_core::error::{PicpostError, Result};
use picpost_core::session::{Session, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

struct StoredSession {
    session: Session,
    expires_at: DateTime<Utc>,
}

pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Drops every expired record and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        before - sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let now = self.clock.now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                None => return Ok(None),
                Some(stored) if stored.expires_at > now => {
                    return Ok(Some(stored.session.clone()));
                }
                Some(_) => {}
            }
        }

        tracing::debug!(session_id = %session_id, "[SessionStore] session expired");
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(session_id)
            .is_some_and(|stored| stored.expires_at <= now)
        {
            sessions.remove(session_id);
        }
        Ok(None)
    }

    async fn put(&self, session: &Session, ttl: Duration) -> Result<()> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
            .ok_or_else(|| PicpostError::config(format!("session TTL out of range: {ttl:?}")))?;
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session.id.clone(),
            StoredSession {
                session: session.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}
