//! sea-orm-backed [`Store`] implementations for the embedded-file (SQLite)
//! and relational (Postgres) deployment profiles. Both share one code path;
//! only the connection string and pool sizing differ.

pub mod conv;
pub mod entities;
pub mod migration;

mod accounts;
mod audit;
mod auth;
mod discovery;
mod pools;
mod recommendations;
mod search;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

use cloudpam_core::model::{
    Account, AccountUpdate, ApiKey, AuditEvent, BootstrapToken, DiscoveredResource, DiscoveryAgent,
    NewAccount, NewAuditEvent, NewPool, NewRecommendation, NewUser, Pool, PoolNode, PoolStats,
    PoolUpdate, Recommendation, Session, SyncJob, User,
};
use cloudpam_store::{
    AccountFilter, AgentFilter, AuditFilter, DiscoveredResourceFilter, Page, PageRequest,
    PoolFilter, RecommendationFilter, SearchHit, SearchQuery, Store, StoreResult,
};

/// A `Store` backed by a sea-orm `DatabaseConnection`. Works against both
/// SQLite (embedded-file profile) and Postgres (relational profile); the
/// connection string alone determines the backend sea-orm dispatches to.
pub struct SeaStore {
    db: DatabaseConnection,
}

/// The embedded-file deployment profile. A thin name for `SeaStore` pointed
/// at a SQLite file, with its connection pool capped at a single connection
/// since SQLite serializes writers anyway.
pub type SqliteStore = SeaStore;

/// The relational deployment profile: `SeaStore` pointed at Postgres.
pub type PostgresStore = SeaStore;

impl SeaStore {
    /// Opens a SQLite database at `path` (created if absent), runs pending
    /// migrations, and returns a store capped to one connection.
    pub async fn connect_sqlite(path: &str, app_version: &str) -> anyhow::Result<Self> {
        let url = format!("sqlite://{path}?mode=rwc");
        let mut opts = ConnectOptions::new(url);
        opts.max_connections(1).min_connections(1);
        let db = Database::connect(opts).await?;
        migration::run(&db, app_version).await?;
        Ok(Self { db })
    }

    /// Opens a Postgres connection pool at `dsn`, runs pending migrations.
    pub async fn connect_postgres(dsn: &str, app_version: &str) -> anyhow::Result<Self> {
        let opts = ConnectOptions::new(dsn.to_owned());
        let db = Database::connect(opts).await?;
        migration::run(&db, app_version).await?;
        Ok(Self { db })
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for SeaStore {
    async fn list_pools(&self, org_id: Uuid, filter: &PoolFilter, page: PageRequest) -> StoreResult<Page<Pool>> {
        pools::list_pools(&self.db, org_id, filter, page).await
    }

    async fn get_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Pool> {
        pools::get_pool(&self.db, org_id, id).await
    }

    async fn create_pool(&self, pool: NewPool) -> StoreResult<Pool> {
        pools::create_pool(&self.db, pool).await
    }

    async fn update_pool(&self, org_id: Uuid, id: i64, update: PoolUpdate) -> StoreResult<Pool> {
        pools::update_pool(&self.db, org_id, id, update).await
    }

    async fn delete_pool(&self, org_id: Uuid, id: i64) -> StoreResult<()> {
        pools::delete_pool(&self.db, org_id, id).await
    }

    async fn cascade_delete_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Vec<i64>> {
        pools::cascade_delete_pool(&self.db, org_id, id).await
    }

    async fn list_children(&self, org_id: Uuid, parent_id: i64) -> StoreResult<Vec<Pool>> {
        pools::list_children(&self.db, org_id, parent_id).await
    }

    async fn hierarchy(&self, org_id: Uuid, root: Option<i64>) -> StoreResult<Vec<PoolNode>> {
        pools::hierarchy(&self.db, org_id, root).await
    }

    async fn get_pool_with_stats(&self, org_id: Uuid, id: i64) -> StoreResult<(Pool, PoolStats)> {
        pools::get_pool_with_stats(&self.db, org_id, id).await
    }

    async fn list_accounts(&self, org_id: Uuid, filter: &AccountFilter, page: PageRequest) -> StoreResult<Page<Account>> {
        accounts::list_accounts(&self.db, org_id, filter, page).await
    }

    async fn get_account(&self, org_id: Uuid, id: i64) -> StoreResult<Account> {
        accounts::get_account(&self.db, org_id, id).await
    }

    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        accounts::create_account(&self.db, account).await
    }

    async fn update_account(&self, org_id: Uuid, id: i64, update: AccountUpdate) -> StoreResult<Account> {
        accounts::update_account(&self.db, org_id, id, update).await
    }

    async fn delete_account(&self, org_id: Uuid, id: i64, force: bool) -> StoreResult<()> {
        accounts::delete_account(&self.db, org_id, id, force).await
    }

    async fn search(&self, org_id: Uuid, query: &SearchQuery, page: PageRequest) -> StoreResult<Page<SearchHit>> {
        search::search(&self.db, org_id, query, page).await
    }

    async fn list_discovered_resources(&self, org_id: Uuid, filter: &DiscoveredResourceFilter, page: PageRequest) -> StoreResult<Page<DiscoveredResource>> {
        discovery::list_discovered_resources(&self.db, org_id, filter, page).await
    }

    async fn link_resource(&self, org_id: Uuid, resource_id: Uuid, pool_id: Option<i64>) -> StoreResult<DiscoveredResource> {
        discovery::link_resource(&self.db, org_id, resource_id, pool_id).await
    }

    async fn list_agents(&self, org_id: Uuid, filter: &AgentFilter) -> StoreResult<Vec<DiscoveryAgent>> {
        discovery::list_agents(&self.db, org_id, filter).await
    }

    async fn create_agent(&self, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
        discovery::create_agent(&self.db, agent).await
    }

    async fn get_agent(&self, org_id: Uuid, id: Uuid) -> StoreResult<DiscoveryAgent> {
        discovery::get_agent(&self.db, org_id, id).await
    }

    async fn update_agent(&self, org_id: Uuid, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
        discovery::update_agent(&self.db, org_id, agent).await
    }

    async fn heartbeat_agent(&self, org_id: Uuid, id: Uuid, now: DateTime<Utc>) -> StoreResult<DiscoveryAgent> {
        discovery::heartbeat_agent(&self.db, org_id, id, now).await
    }

    async fn create_sync_job(&self, job: SyncJob) -> StoreResult<SyncJob> {
        discovery::create_sync_job(&self.db, job).await
    }

    async fn update_sync_job(&self, org_id: Uuid, job: SyncJob) -> StoreResult<SyncJob> {
        discovery::update_sync_job(&self.db, org_id, job).await
    }

    async fn list_bootstrap_tokens(&self, org_id: Uuid) -> StoreResult<Vec<BootstrapToken>> {
        discovery::list_bootstrap_tokens(&self.db, org_id).await
    }

    async fn create_bootstrap_token(&self, token: BootstrapToken) -> StoreResult<BootstrapToken> {
        discovery::create_bootstrap_token(&self.db, token).await
    }

    async fn get_bootstrap_token_by_hash(&self, token_hash: &str) -> StoreResult<BootstrapToken> {
        discovery::get_bootstrap_token_by_hash(&self.db, token_hash).await
    }

    async fn update_bootstrap_token(&self, org_id: Uuid, token: BootstrapToken) -> StoreResult<BootstrapToken> {
        discovery::update_bootstrap_token(&self.db, org_id, token).await
    }

    async fn ingest_resources(&self, org_id: Uuid, account_id: i64, incoming: Vec<cloudpam_core::model::IncomingResource>, now: DateTime<Utc>) -> StoreResult<cloudpam_core::model::SyncJobCounters> {
        discovery::ingest_resources(&self.db, org_id, account_id, incoming, now).await
    }

    async fn append_audit(&self, event: NewAuditEvent) -> StoreResult<AuditEvent> {
        audit::append_audit(&self.db, event).await
    }

    async fn list_audit(&self, org_id: Uuid, filter: &AuditFilter, page: PageRequest) -> StoreResult<Page<AuditEvent>> {
        audit::list_audit(&self.db, org_id, filter, page).await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        auth::create_user(&self.db, user).await
    }

    async fn get_user(&self, org_id: Uuid, id: Uuid) -> StoreResult<User> {
        auth::get_user(&self.db, org_id, id).await
    }

    async fn get_user_by_username(&self, org_id: Uuid, username: &str) -> StoreResult<User> {
        auth::get_user_by_username(&self.db, org_id, username).await
    }

    async fn list_users(&self, org_id: Uuid, page: PageRequest) -> StoreResult<Page<User>> {
        auth::list_users(&self.db, org_id, page).await
    }

    async fn update_user(&self, org_id: Uuid, user: User) -> StoreResult<User> {
        auth::update_user(&self.db, org_id, user).await
    }

    async fn delete_user(&self, org_id: Uuid, id: Uuid) -> StoreResult<()> {
        auth::delete_user(&self.db, org_id, id).await
    }

    async fn create_session(&self, session: Session) -> StoreResult<Session> {
        auth::create_session(&self.db, session).await
    }

    async fn get_session(&self, id: &str) -> StoreResult<Session> {
        auth::get_session(&self.db, id).await
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Session>> {
        auth::list_sessions_for_user(&self.db, user_id).await
    }

    async fn touch_session(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Session> {
        auth::touch_session(&self.db, id, now).await
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        auth::delete_session(&self.db, id).await
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        auth::cleanup_expired_sessions(&self.db, now).await
    }

    async fn create_api_key(&self, key: ApiKey) -> StoreResult<ApiKey> {
        auth::create_api_key(&self.db, key).await
    }

    async fn list_api_keys(&self, org_id: Uuid, user_id: Option<Uuid>) -> StoreResult<Vec<ApiKey>> {
        auth::list_api_keys(&self.db, org_id, user_id).await
    }

    async fn get_api_key_by_prefix(&self, prefix: &str) -> StoreResult<ApiKey> {
        auth::get_api_key_by_prefix(&self.db, prefix).await
    }

    async fn revoke_api_key(&self, org_id: Uuid, id: Uuid) -> StoreResult<()> {
        auth::revoke_api_key(&self.db, org_id, id).await
    }

    async fn list_recommendations(&self, org_id: Uuid, filter: &RecommendationFilter, page: PageRequest) -> StoreResult<Page<Recommendation>> {
        recommendations::list_recommendations(&self.db, org_id, filter, page).await
    }

    async fn create_recommendations(&self, recs: Vec<NewRecommendation>) -> StoreResult<Vec<Recommendation>> {
        recommendations::create_recommendations(&self.db, recs).await
    }

    async fn get_recommendation(&self, org_id: Uuid, id: Uuid) -> StoreResult<Recommendation> {
        recommendations::get_recommendation(&self.db, org_id, id).await
    }

    async fn apply_recommendation(&self, org_id: Uuid, id: Uuid, created_pool_id: i64) -> StoreResult<Recommendation> {
        recommendations::apply_recommendation(&self.db, org_id, id, created_pool_id).await
    }

    async fn dismiss_recommendation(&self, org_id: Uuid, id: Uuid, reason: Option<String>) -> StoreResult<Recommendation> {
        recommendations::dismiss_recommendation(&self.db, org_id, id, reason).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        use sea_orm::ConnectionTrait;
        self.db.execute_unprepared("SELECT 1").await?;
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.db.clone().close().await?;
        Ok(())
    }
}
