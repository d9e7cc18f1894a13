//! In-memory session store.
//!
//! A session is minted after the identity provider has verified the user and
//! their organization has been resolved; the bearer token is the session id.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

// Ten years; keeps the chrono arithmetic in range for absurd settings
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub tenant_id: String,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_hours: u64) -> Self {
        let hours = ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS) as i64;
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::hours(hours),
        }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        organization_id: Uuid,
        user_id: Uuid,
        user_email: &str,
    ) -> SessionContext {
        let session = SessionContext {
            session_id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            organization_id,
            user_id,
            user_email: user_email.to_string(),
            expires_at: Utc::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id, session.clone());
        session
    }

    /// The live session for `session_id`; an expired one is dropped.
    pub async fn validate(&self, session_id: Uuid) -> Option<SessionContext> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&session_id) {
                Some(session) if !session.is_expired(now) => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions.remove(&session_id);
        tracing::debug!(%session_id, "Expired session removed");
        None
    }

    pub async fn revoke(&self, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&session_id).is_some()
    }

    /// Drop every expired session, returning the ids that went.
    pub async fn purge_expired(&self) -> Vec<Uuid> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|session| session.is_expired(now))
            .map(|session| session.session_id)
            .collect();
        for session_id in &expired {
            sessions.remove(session_id);
        }
        expired
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn expire_now(&self, session_id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&session_id) {
            session.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}
