//! Session lifecycle
//!
//! Tokens are opaque, URL-safe and random. Expired sessions are never handed
//! out: a lookup that finds one deletes it and reports "not found", and a
//! background sweep removes the rest.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{Session, SessionPurpose};
use crate::ports::{session_token, Clock, RandomSource};
use crate::store::SessionStore;
use crate::types::Result;

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        random: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            random,
            clock,
        }
    }

    /// Issue a session for `user_id` with the default lifetime of `purpose`
    pub async fn create(
        &self,
        user_id: &str,
        purpose: SessionPurpose,
        ceremony: Option<Vec<u8>>,
    ) -> Result<Session> {
        let now = self.clock.now();
        let session = Session {
            token: session_token(self.random.as_ref()),
            user_id: user_id.to_string(),
            purpose,
            ceremony,
            created_at: now,
            updated_at: now,
            expires_at: now + purpose.ttl(),
        };
        self.store.insert(&session).await?;
        debug!(user_id = %user_id, purpose = purpose.as_str(), "Session created");
        Ok(session)
    }

    /// Look up a live session
    pub async fn get(&self, token: &str) -> Result<Option<Session>> {
        let Some(session) = self.store.get(token).await? else {
            return Ok(None);
        };

        if session.is_expired(self.clock.now()) {
            self.store.delete(token).await?;
            debug!(user_id = %session.user_id, "Expired session removed on lookup");
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Idempotent
    pub async fn delete(&self, token: &str) -> Result<()> {
        self.store.delete(token).await
    }

    /// Whether `user_id` holds an unexpired session of `purpose`
    pub async fn has_live(&self, user_id: &str, purpose: SessionPurpose) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .store
            .list_for_user(user_id)
            .await?
            .iter()
            .any(|s| s.purpose == purpose && !s.is_expired(now)))
    }

    pub async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        self.store.delete_for_user(user_id).await
    }

    /// Delete every expired session
    pub async fn sweep(&self) -> Result<u64> {
        self.store.delete_expired(self.clock.now()).await
    }
}

/// Periodically sweep expired sessions; failures are logged and retried
/// on the next tick.
pub fn spawn_sweep_task(
    manager: Arc<SessionManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let handle = tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match manager.sweep().await {
                Ok(0) => {}
                Ok(removed) => debug!("Session sweep: removed {} expired sessions", removed),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }
    });
    info!("Session sweep task started (every {:?})", interval);
    handle
}
