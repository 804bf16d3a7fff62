//! The backend-agnostic storage contract. Every backend (in-memory,
//! embedded SQLite, relational Postgres) implements [`Store`] and must
//! enforce the same invariants from `cloudpam_core::model`.

pub mod error;
pub mod filters;
pub mod page;

pub use error::{StoreError, StoreResult};
pub use filters::{
    AccountFilter, AgentFilter, AuditFilter, BlockFilter, DiscoveredResourceFilter, PoolFilter,
    RecommendationFilter, SearchQuery, SearchResultKind,
};
pub use page::{Page, PageRequest};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cloudpam_core::model::{
    Account, AccountUpdate, ApiKey, AuditEvent, BootstrapToken, DiscoveredResource, DiscoveryAgent,
    NewAccount, NewAuditEvent, NewPool, NewRecommendation, NewUser, Pool, PoolNode, PoolStats,
    PoolUpdate, Recommendation, Session, SyncJob, User,
};

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub kind: SearchResultKind,
    pub pool: Option<Pool>,
    pub account: Option<Account>,
}

/// One per-pool result for a recommendation-apply attempt inside a batch.
#[derive(Debug, Clone)]
pub struct RecommendationApplyResult {
    pub recommendation_id: Uuid,
    pub created_pool: Option<Pool>,
}

/// The contract every backend implements. Operations are context-scoped
/// (callers pass `org_id` explicitly rather than relying on ambient
/// session state) and return [`StoreError`], a discriminable sum type.
#[async_trait]
pub trait Store: Send + Sync {
    // -- Pools -----------------------------------------------------------
    async fn list_pools(
        &self,
        org_id: Uuid,
        filter: &PoolFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Pool>>;

    async fn get_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Pool>;

    async fn create_pool(&self, pool: NewPool) -> StoreResult<Pool>;

    async fn update_pool(&self, org_id: Uuid, id: i64, update: PoolUpdate) -> StoreResult<Pool>;

    /// Refuses with `Conflict` if the pool has live children.
    async fn delete_pool(&self, org_id: Uuid, id: i64) -> StoreResult<()>;

    /// Soft-deletes the pool and its entire live subtree atomically,
    /// returning the ids that were deleted.
    async fn cascade_delete_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Vec<i64>>;

    async fn list_children(&self, org_id: Uuid, parent_id: i64) -> StoreResult<Vec<Pool>>;

    /// Builds the pool tree rooted at `root`, or the full forest when `None`.
    async fn hierarchy(&self, org_id: Uuid, root: Option<i64>) -> StoreResult<Vec<PoolNode>>;

    async fn get_pool_with_stats(&self, org_id: Uuid, id: i64) -> StoreResult<(Pool, PoolStats)>;

    // -- Accounts ----------------------------------------------------------
    async fn list_accounts(
        &self,
        org_id: Uuid,
        filter: &AccountFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Account>>;

    async fn get_account(&self, org_id: Uuid, id: i64) -> StoreResult<Account>;

    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    async fn update_account(&self, org_id: Uuid, id: i64, update: AccountUpdate) -> StoreResult<Account>;

    /// Refuses with `Conflict` unless `force`, in which case the account
    /// and every pool it owns (and their descendants) are soft-deleted
    /// atomically.
    async fn delete_account(&self, org_id: Uuid, id: i64, force: bool) -> StoreResult<()>;

    // -- Search --------------------------------------------------------------
    async fn search(&self, org_id: Uuid, query: &SearchQuery, page: PageRequest) -> StoreResult<Page<SearchHit>>;

    // -- Discovery -----------------------------------------------------------
    async fn list_discovered_resources(
        &self,
        org_id: Uuid,
        filter: &DiscoveredResourceFilter,
        page: PageRequest,
    ) -> StoreResult<Page<DiscoveredResource>>;

    async fn link_resource(&self, org_id: Uuid, resource_id: Uuid, pool_id: Option<i64>) -> StoreResult<DiscoveredResource>;

    async fn list_agents(&self, org_id: Uuid, filter: &AgentFilter) -> StoreResult<Vec<DiscoveryAgent>>;

    async fn create_agent(&self, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent>;

    async fn get_agent(&self, org_id: Uuid, id: Uuid) -> StoreResult<DiscoveryAgent>;

    async fn update_agent(&self, org_id: Uuid, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent>;

    async fn heartbeat_agent(&self, org_id: Uuid, id: Uuid, now: DateTime<Utc>) -> StoreResult<DiscoveryAgent>;

    async fn create_sync_job(&self, job: SyncJob) -> StoreResult<SyncJob>;

    async fn update_sync_job(&self, org_id: Uuid, job: SyncJob) -> StoreResult<SyncJob>;

    async fn list_bootstrap_tokens(&self, org_id: Uuid) -> StoreResult<Vec<BootstrapToken>>;

    async fn create_bootstrap_token(&self, token: BootstrapToken) -> StoreResult<BootstrapToken>;

    async fn get_bootstrap_token_by_hash(&self, token_hash: &str) -> StoreResult<BootstrapToken>;

    async fn update_bootstrap_token(&self, org_id: Uuid, token: BootstrapToken) -> StoreResult<BootstrapToken>;

    /// Upserts discovered resources for one account, marks resources not
    /// present in `incoming` as stale, and tombstones resources already
    /// stale on a prior call. Returns the per-resource outcome counters.
    async fn ingest_resources(
        &self,
        org_id: Uuid,
        account_id: i64,
        incoming: Vec<cloudpam_core::model::IncomingResource>,
        now: DateTime<Utc>,
    ) -> StoreResult<cloudpam_core::model::SyncJobCounters>;

    // -- Audit ---------------------------------------------------------------
    async fn append_audit(&self, event: NewAuditEvent) -> StoreResult<AuditEvent>;

    async fn list_audit(
        &self,
        org_id: Uuid,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> StoreResult<Page<AuditEvent>>;

    // -- Auth ------------------------------------------------------------
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user(&self, org_id: Uuid, id: Uuid) -> StoreResult<User>;

    async fn get_user_by_username(&self, org_id: Uuid, username: &str) -> StoreResult<User>;

    async fn list_users(&self, org_id: Uuid, page: PageRequest) -> StoreResult<Page<User>>;

    async fn update_user(&self, org_id: Uuid, user: User) -> StoreResult<User>;

    async fn delete_user(&self, org_id: Uuid, id: Uuid) -> StoreResult<()>;

    async fn create_session(&self, session: Session) -> StoreResult<Session>;

    async fn get_session(&self, id: &str) -> StoreResult<Session>;

    /// All live sessions for a user, most-recently-created first — used
    /// to enforce the per-user concurrent session cap.
    async fn list_sessions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Session>>;

    async fn touch_session(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Session>;

    async fn delete_session(&self, id: &str) -> StoreResult<()>;

    /// Deletes all sessions whose `expires_at` is at or before `now`,
    /// returning the count removed.
    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    async fn create_api_key(&self, key: ApiKey) -> StoreResult<ApiKey>;

    async fn list_api_keys(&self, org_id: Uuid, user_id: Option<Uuid>) -> StoreResult<Vec<ApiKey>>;

    async fn get_api_key_by_prefix(&self, prefix: &str) -> StoreResult<ApiKey>;

    async fn revoke_api_key(&self, org_id: Uuid, id: Uuid) -> StoreResult<()>;

    // -- Recommendations -----------------------------------------------------
    async fn list_recommendations(
        &self,
        org_id: Uuid,
        filter: &RecommendationFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Recommendation>>;

    async fn create_recommendations(&self, recs: Vec<NewRecommendation>) -> StoreResult<Vec<Recommendation>>;

    async fn get_recommendation(&self, org_id: Uuid, id: Uuid) -> StoreResult<Recommendation>;

    /// Transitions a pending recommendation to `applied`, recording
    /// `applied_pool_id`. Returns `Conflict` if it was not pending.
    async fn apply_recommendation(&self, org_id: Uuid, id: Uuid, created_pool_id: i64) -> StoreResult<Recommendation>;

    /// Transitions a pending recommendation to `dismissed`.
    async fn dismiss_recommendation(&self, org_id: Uuid, id: Uuid, reason: Option<String>) -> StoreResult<Recommendation>;

    // -- Lifecycle -------------------------------------------------------
    async fn ping(&self) -> anyhow::Result<()>;

    async fn close(&self) -> anyhow::Result<()>;
}
