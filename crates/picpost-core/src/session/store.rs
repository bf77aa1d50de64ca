//! Session store trait.
//!
//! Defines the interface for TTL-bearing session persistence.

use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value persistence for wizard sessions, keyed by conversation thread id.
///
/// # Implementation Notes
///
/// Implementations must treat an expired record exactly like a missing one. There is no
/// other expiration mechanism: nothing cancels a session except `delete` or its TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Finds a live session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found and not expired
    /// - `Ok(None)`: Session missing or expired
    /// - `Err(_)`: Error occurred during retrieval
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Writes a session, replacing any previous record and resetting its expiry to `ttl`.
    async fn put(&self, session: &Session, ttl: Duration) -> Result<()>;

    /// Removes a session. Deleting a missing session succeeds.
    async fn delete(&self, session_id: &str) -> Result<()>;
}
