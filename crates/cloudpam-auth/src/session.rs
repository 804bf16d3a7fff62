//! Server-side sessions: opaque random ids, HTTP-only/same-site cookies,
//! and per-user concurrent session eviction.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use uuid::Uuid;

use cloudpam_core::model::Session;
use cloudpam_store::{Store, StoreResult};

/// 128+ bits of entropy, hex-encoded so it's a safe cookie value as-is.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct SessionConfig {
    pub lifetime: Duration,
    pub max_concurrent_per_user: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { lifetime: Duration::hours(24), max_concurrent_per_user: 5 }
    }
}

pub struct SessionService {
    store: Arc<dyn Store>,
    config: SessionConfig,
}

impl SessionService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Creates a session for `user_id`, evicting the oldest live session
    /// first if the user is already at the concurrency cap.
    pub async fn create(&self, user_id: Uuid, ip: Option<IpAddr>, user_agent: Option<String>) -> StoreResult<Session> {
        let existing = self.store.list_sessions_for_user(user_id).await?;
        let now = Utc::now();
        let live: Vec<&Session> = existing.iter().filter(|s| !s.is_expired(now)).collect();
        if live.len() >= self.config.max_concurrent_per_user {
            if let Some(oldest) = live.iter().min_by_key(|s| s.created_at) {
                self.store.delete_session(&oldest.id).await?;
            }
        }

        let session = Session {
            id: generate_session_id(),
            user_id,
            created_at: now,
            expires_at: now + self.config.lifetime,
            last_used_at: now,
            ip,
            user_agent,
        };
        self.store.create_session(session).await
    }

    /// Resolves a session id to a live session, touching its
    /// `last_used_at`. Returns `None` for an unknown or expired session
    /// rather than propagating `NotFound` — both are "not authenticated".
    pub async fn resolve(&self, session_id: &str) -> Option<Session> {
        let session = self.store.get_session(session_id).await.ok()?;
        let now = Utc::now();
        if session.is_expired(now) {
            let _ = self.store.delete_session(session_id).await;
            return None;
        }
        self.store.touch_session(session_id, now).await.ok()
    }

    pub async fn revoke(&self, session_id: &str) -> StoreResult<()> {
        self.store.delete_session(session_id).await
    }

    /// Removes every session expired as of `now`, for a periodic sweep.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.store.cleanup_expired_sessions(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_store_memory::MemoryStore;

    #[tokio::test]
    async fn create_then_resolve_round_trips() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let svc = SessionService::new(store, SessionConfig::default());
        let user_id = Uuid::new_v4();
        let session = svc.create(user_id, None, None).await.unwrap();
        let resolved = svc.resolve(&session.id).await.unwrap();
        assert_eq!(resolved.user_id, user_id);
    }

    #[tokio::test]
    async fn cap_evicts_the_oldest_session() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let svc = SessionService::new(store, SessionConfig { lifetime: Duration::hours(24), max_concurrent_per_user: 2 });
        let user_id = Uuid::new_v4();
        let first = svc.create(user_id, None, None).await.unwrap();
        let _second = svc.create(user_id, None, None).await.unwrap();
        let _third = svc.create(user_id, None, None).await.unwrap();
        assert!(svc.resolve(&first.id).await.is_none());
    }
}
