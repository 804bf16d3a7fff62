//! Discovery subsystem orchestration: agent registration, heartbeat, and
//! resource ingest atop the [`Store`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use cloudpam_core::model::{
    Action, ApiKey, ApprovalStatus, AuditAction, BootstrapToken, DiscoveryAgent, IncomingResource, Permission, Resource, SyncJob,
    SyncJobCounters, SyncJobStatus, SyncSource,
};
use cloudpam_store::{AgentFilter, DiscoveredResourceFilter, Store, StoreError, StoreResult};

use cloudpam_audit::AuditSink;

use crate::context::ActorContext;

/// Diagnostic classification of a bootstrap token, named to match the
/// states `BootstrapToken::is_valid` collapses into a single boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Exhausted,
    Revoked,
    Expired,
}

impl TokenState {
    #[must_use]
    pub fn of(token: &BootstrapToken, now: DateTime<Utc>) -> Self {
        if token.revoked {
            return TokenState::Revoked;
        }
        if let Some(expires_at) = token.expires_at {
            if now >= expires_at {
                return TokenState::Expired;
            }
        }
        if let Some(max_uses) = token.max_uses {
            if token.used_count >= max_uses {
                return TokenState::Exhausted;
            }
        }
        TokenState::Valid
    }
}

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub agent_id: Uuid,
    pub api_key: Option<String>,
    pub approval_status: ApprovalStatus,
}

pub struct DiscoveryService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    auto_approve: bool,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>, auto_approve: bool) -> Self {
        Self { store, audit, auto_approve }
    }

    fn hash_token(raw: &str) -> String {
        hex::encode(Sha256::digest(raw.as_bytes()))
    }

    /// Byte-for-byte comparison that takes time proportional to length
    /// only, not to the position of the first mismatch.
    fn constant_time_eq(a: &str, b: &str) -> bool {
        let (a, b) = (a.as_bytes(), b.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }

    fn generate_secret(len: usize) -> String {
        use rand::Rng;
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..len).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
    }

    /// Validates the bootstrap token, consumes one use, creates the agent
    /// record (auto-approved when configured, pending otherwise), and
    /// mints a `discovery:create`-scoped API key when approved.
    pub async fn register(
        &self,
        ctx: &ActorContext,
        org_id: Uuid,
        name: String,
        account_id: i64,
        raw_token: &str,
        version: String,
        hostname: String,
    ) -> StoreResult<RegisterOutcome> {
        let now = Utc::now();
        let token_hash = Self::hash_token(raw_token);
        let token = self.store.get_bootstrap_token_by_hash(&token_hash).await?;
        if !Self::constant_time_eq(&token.token_hash, &token_hash) {
            return Err(StoreError::Unauthenticated("bootstrap token mismatch".into()));
        }
        match TokenState::of(&token, now) {
            TokenState::Valid => {}
            TokenState::Revoked => return Err(StoreError::Unauthenticated("bootstrap token has been revoked".into())),
            TokenState::Expired => return Err(StoreError::Unauthenticated("bootstrap token has expired".into())),
            TokenState::Exhausted => return Err(StoreError::Unauthenticated("bootstrap token has no uses remaining".into())),
        }
        if !token.is_account_compatible(account_id) {
            return Err(StoreError::Validation("bootstrap token is not valid for this account".into()));
        }

        let mut consumed = token.clone();
        consumed.used_count += 1;
        self.store.update_bootstrap_token(org_id, consumed).await?;

        let approval_status = if self.auto_approve { ApprovalStatus::Approved } else { ApprovalStatus::PendingApproval };
        let agent_id = Uuid::new_v4();
        let approved = matches!(approval_status, ApprovalStatus::Approved);

        let api_key = if approved {
            let prefix = Self::generate_secret(8);
            let secret = Self::generate_secret(32);
            let full_key = format!("cpam_v1_{prefix}_{secret}");
            let key = ApiKey {
                id: Uuid::new_v4(),
                org_id,
                name: format!("agent:{name}"),
                prefix,
                secret_hash: Self::hash_token(&full_key),
                scopes: vec![Permission::new(Resource::Discovery, Action::Create)],
                created_by: None,
                expires_at: None,
                created_at: now,
                last_used_at: None,
                revoked: false,
            };
            let created_key = self.store.create_api_key(key).await?;
            Some((created_key.id, full_key))
        } else {
            None
        };

        let agent = DiscoveryAgent {
            id: agent_id,
            name: name.clone(),
            account_id,
            api_key_id: api_key.as_ref().map(|(id, _)| *id),
            approval_status,
            bootstrap_token_id: token.id,
            version,
            hostname,
            last_seen_at: now,
            approved_at: approved.then_some(now),
            approved_by: None,
        };

        let created = match self.store.create_agent(agent).await {
            Ok(created) => created,
            Err(e) => {
                // best-effort compensation: the token use above isn't
                // transactional with this insert, so give it back on failure.
                let _ = self.store.update_bootstrap_token(org_id, token.clone()).await;
                return Err(e);
            }
        };

        self.audit
            .record(ctx.event(
                org_id,
                AuditAction::Register,
                "discovery_agent",
                created.id.to_string(),
                None,
                serde_json::to_value(&created).ok(),
            ))
            .await;

        Ok(RegisterOutcome {
            agent_id: created.id,
            api_key: api_key.map(|(_, raw)| raw),
            approval_status,
        })
    }

    pub async fn approve_agent(&self, ctx: &ActorContext, org_id: Uuid, agent_id: Uuid, approved_by: Uuid) -> StoreResult<DiscoveryAgent> {
        let mut agent = self.store.get_agent(org_id, agent_id).await?;
        if agent.approval_status != ApprovalStatus::PendingApproval {
            return Err(StoreError::Conflict("agent is not pending approval".into()));
        }
        agent.approval_status = ApprovalStatus::Approved;
        agent.approved_at = Some(Utc::now());
        agent.approved_by = Some(approved_by);
        let updated = self.store.update_agent(org_id, agent).await?;
        self.audit
            .record(ctx.event(org_id, AuditAction::Approve, "discovery_agent", agent_id.to_string(), None, serde_json::to_value(&updated).ok()))
            .await;
        Ok(updated)
    }

    pub async fn reject_agent(&self, ctx: &ActorContext, org_id: Uuid, agent_id: Uuid) -> StoreResult<DiscoveryAgent> {
        let mut agent = self.store.get_agent(org_id, agent_id).await?;
        if agent.approval_status != ApprovalStatus::PendingApproval {
            return Err(StoreError::Conflict("agent is not pending approval".into()));
        }
        agent.approval_status = ApprovalStatus::Rejected;
        let updated = self.store.update_agent(org_id, agent).await?;
        self.audit
            .record(ctx.event(org_id, AuditAction::Reject, "discovery_agent", agent_id.to_string(), None, serde_json::to_value(&updated).ok()))
            .await;
        Ok(updated)
    }

    pub async fn heartbeat(
        &self,
        org_id: Uuid,
        agent_id: Uuid,
        name: String,
        account_id: i64,
        version: String,
        hostname: String,
    ) -> StoreResult<DiscoveryAgent> {
        let mut agent = self.store.get_agent(org_id, agent_id).await?;
        agent.name = name;
        agent.account_id = account_id;
        agent.version = version;
        agent.hostname = hostname;
        agent.last_seen_at = Utc::now();
        self.store.update_agent(org_id, agent).await
    }

    pub async fn list_agents(&self, org_id: Uuid, filter: &AgentFilter) -> StoreResult<Vec<DiscoveryAgent>> {
        self.store.list_agents(org_id, filter).await
    }

    pub async fn list_discovered_resources(
        &self,
        org_id: Uuid,
        filter: &DiscoveredResourceFilter,
        page: cloudpam_store::PageRequest,
    ) -> StoreResult<cloudpam_store::Page<cloudpam_core::model::DiscoveredResource>> {
        self.store.list_discovered_resources(org_id, filter, page).await
    }

    pub async fn link_resource(
        &self,
        org_id: Uuid,
        resource_id: Uuid,
        pool_id: Option<i64>,
    ) -> StoreResult<cloudpam_core::model::DiscoveredResource> {
        self.store.link_resource(org_id, resource_id, pool_id).await
    }

    /// Opens a `SyncJob`, delegates the upsert/stale/tombstone pass to the
    /// `Store`, and closes the job as completed or failed. A mid-ingest
    /// failure leaves prior upserts visible — ingest is intentionally
    /// incremental, not transactional per job.
    pub async fn ingest(
        &self,
        ctx: &ActorContext,
        org_id: Uuid,
        account_id: i64,
        agent_id: Option<Uuid>,
        resources: Vec<IncomingResource>,
    ) -> StoreResult<SyncJob> {
        let now = Utc::now();
        let mut job = SyncJob {
            id: Uuid::new_v4(),
            account_id,
            status: SyncJobStatus::Running,
            source: if agent_id.is_some() { SyncSource::Agent } else { SyncSource::Local },
            agent_id,
            started_at: now,
            finished_at: None,
            counters: SyncJobCounters::default(),
            error: None,
        };
        self.store.create_sync_job(job.clone()).await?;

        match self.store.ingest_resources(org_id, account_id, resources, now).await {
            Ok(counters) => {
                job.status = SyncJobStatus::Completed;
                job.finished_at = Some(Utc::now());
                job.counters = counters;
                self.store.update_sync_job(org_id, job.clone()).await?;
                self.audit
                    .record(ctx.event(org_id, AuditAction::Create, "sync_job", job.id.to_string(), None, serde_json::to_value(&job).ok()))
                    .await;
                Ok(job)
            }
            Err(e) => {
                job.status = SyncJobStatus::Failed;
                job.finished_at = Some(Utc::now());
                job.error = Some(e.to_string());
                let _ = self.store.update_sync_job(org_id, job.clone()).await;
                Err(e)
            }
        }
    }
}
