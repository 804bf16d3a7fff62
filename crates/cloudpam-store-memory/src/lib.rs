//! Process-local `Store` backend. The default for local development and for
//! the in-memory leg of the conformance test suite; every operation holds
//! `parking_lot::RwLock<Inner>` for the span of the call, so it is not
//! suitable as the production backend for multi-replica deployments.

mod accounts;
mod audit;
mod auth;
mod discovery;
mod pools;
mod recommendations;
mod search;
mod state;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use cloudpam_core::model::{
    Account, AccountUpdate, ApiKey, AuditEvent, BootstrapToken, DiscoveredResource, DiscoveryAgent,
    IncomingResource, NewAccount, NewAuditEvent, NewPool, NewRecommendation, NewUser, Pool,
    PoolNode, PoolStats, PoolUpdate, Recommendation, Session, SyncJob, SyncJobCounters, User,
};
use cloudpam_store::{
    AccountFilter, AgentFilter, AuditFilter, DiscoveredResourceFilter, Page, PageRequest,
    PoolFilter, RecommendationFilter, SearchHit, SearchQuery, Store, StoreResult,
};

use state::Inner;

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_pools(&self, org_id: Uuid, filter: &PoolFilter, page: PageRequest) -> StoreResult<Page<Pool>> {
        self.inner.read().list_pools(org_id, filter, page)
    }

    async fn get_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Pool> {
        self.inner.read().get_pool(org_id, id)
    }

    async fn create_pool(&self, pool: NewPool) -> StoreResult<Pool> {
        self.inner.write().create_pool(pool)
    }

    async fn update_pool(&self, org_id: Uuid, id: i64, update: PoolUpdate) -> StoreResult<Pool> {
        self.inner.write().update_pool(org_id, id, update)
    }

    async fn delete_pool(&self, org_id: Uuid, id: i64) -> StoreResult<()> {
        self.inner.write().delete_pool(org_id, id)
    }

    async fn cascade_delete_pool(&self, org_id: Uuid, id: i64) -> StoreResult<Vec<i64>> {
        self.inner.write().cascade_delete_pool(org_id, id)
    }

    async fn list_children(&self, org_id: Uuid, parent_id: i64) -> StoreResult<Vec<Pool>> {
        self.inner.read().list_children(org_id, parent_id)
    }

    async fn hierarchy(&self, org_id: Uuid, root: Option<i64>) -> StoreResult<Vec<PoolNode>> {
        self.inner.read().hierarchy(org_id, root)
    }

    async fn get_pool_with_stats(&self, org_id: Uuid, id: i64) -> StoreResult<(Pool, PoolStats)> {
        self.inner.read().get_pool_with_stats(org_id, id)
    }

    async fn list_accounts(&self, org_id: Uuid, filter: &AccountFilter, page: PageRequest) -> StoreResult<Page<Account>> {
        self.inner.read().list_accounts(org_id, filter, page)
    }

    async fn get_account(&self, org_id: Uuid, id: i64) -> StoreResult<Account> {
        self.inner.read().get_account(org_id, id)
    }

    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        self.inner.write().create_account(account)
    }

    async fn update_account(&self, org_id: Uuid, id: i64, update: AccountUpdate) -> StoreResult<Account> {
        self.inner.write().update_account(org_id, id, update)
    }

    async fn delete_account(&self, org_id: Uuid, id: i64, force: bool) -> StoreResult<()> {
        self.inner.write().delete_account(org_id, id, force)
    }

    async fn search(&self, org_id: Uuid, query: &SearchQuery, page: PageRequest) -> StoreResult<Page<SearchHit>> {
        self.inner.read().search(org_id, query, page)
    }

    async fn list_discovered_resources(
        &self,
        org_id: Uuid,
        filter: &DiscoveredResourceFilter,
        page: PageRequest,
    ) -> StoreResult<Page<DiscoveredResource>> {
        self.inner.read().list_discovered_resources(org_id, filter, page)
    }

    async fn link_resource(&self, org_id: Uuid, resource_id: Uuid, pool_id: Option<i64>) -> StoreResult<DiscoveredResource> {
        self.inner.write().link_resource(org_id, resource_id, pool_id)
    }

    async fn list_agents(&self, org_id: Uuid, filter: &AgentFilter) -> StoreResult<Vec<DiscoveryAgent>> {
        self.inner.read().list_agents(org_id, filter)
    }

    async fn create_agent(&self, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
        self.inner.write().create_agent(agent)
    }

    async fn get_agent(&self, org_id: Uuid, id: Uuid) -> StoreResult<DiscoveryAgent> {
        self.inner.read().get_agent(org_id, id)
    }

    async fn update_agent(&self, org_id: Uuid, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
        self.inner.write().update_agent(org_id, agent)
    }

    async fn heartbeat_agent(&self, org_id: Uuid, id: Uuid, now: DateTime<Utc>) -> StoreResult<DiscoveryAgent> {
        self.inner.write().heartbeat_agent(org_id, id, now)
    }

    async fn create_sync_job(&self, job: SyncJob) -> StoreResult<SyncJob> {
        self.inner.write().create_sync_job(job)
    }

    async fn update_sync_job(&self, org_id: Uuid, job: SyncJob) -> StoreResult<SyncJob> {
        self.inner.write().update_sync_job(org_id, job)
    }

    async fn list_bootstrap_tokens(&self, org_id: Uuid) -> StoreResult<Vec<BootstrapToken>> {
        self.inner.read().list_bootstrap_tokens(org_id)
    }

    async fn create_bootstrap_token(&self, token: BootstrapToken) -> StoreResult<BootstrapToken> {
        self.inner.write().create_bootstrap_token(token)
    }

    async fn get_bootstrap_token_by_hash(&self, token_hash: &str) -> StoreResult<BootstrapToken> {
        self.inner.read().get_bootstrap_token_by_hash(token_hash)
    }

    async fn update_bootstrap_token(&self, org_id: Uuid, token: BootstrapToken) -> StoreResult<BootstrapToken> {
        self.inner.write().update_bootstrap_token(org_id, token)
    }

    async fn ingest_resources(
        &self,
        org_id: Uuid,
        account_id: i64,
        incoming: Vec<IncomingResource>,
        now: DateTime<Utc>,
    ) -> StoreResult<SyncJobCounters> {
        self.inner.write().ingest_resources(org_id, account_id, incoming, now)
    }

    async fn append_audit(&self, event: NewAuditEvent) -> StoreResult<AuditEvent> {
        self.inner.write().append_audit(event)
    }

    async fn list_audit(&self, org_id: Uuid, filter: &AuditFilter, page: PageRequest) -> StoreResult<Page<AuditEvent>> {
        self.inner.read().list_audit(org_id, filter, page)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.inner.write().create_user(user)
    }

    async fn get_user(&self, org_id: Uuid, id: Uuid) -> StoreResult<User> {
        self.inner.read().get_user(org_id, id)
    }

    async fn get_user_by_username(&self, org_id: Uuid, username: &str) -> StoreResult<User> {
        self.inner.read().get_user_by_username(org_id, username)
    }

    async fn list_users(&self, org_id: Uuid, page: PageRequest) -> StoreResult<Page<User>> {
        self.inner.read().list_users(org_id, page)
    }

    async fn update_user(&self, org_id: Uuid, user: User) -> StoreResult<User> {
        self.inner.write().update_user(org_id, user)
    }

    async fn delete_user(&self, org_id: Uuid, id: Uuid) -> StoreResult<()> {
        self.inner.write().delete_user(org_id, id)
    }

    async fn create_session(&self, session: Session) -> StoreResult<Session> {
        self.inner.write().create_session(session)
    }

    async fn get_session(&self, id: &str) -> StoreResult<Session> {
        self.inner.read().get_session(id)
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Session>> {
        self.inner.read().list_sessions_for_user(user_id)
    }

    async fn touch_session(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Session> {
        self.inner.write().touch_session(id, now)
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.inner.write().delete_session(id)
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.inner.write().cleanup_expired_sessions(now)
    }

    async fn create_api_key(&self, key: ApiKey) -> StoreResult<ApiKey> {
        self.inner.write().create_api_key(key)
    }

    async fn list_api_keys(&self, org_id: Uuid, user_id: Option<Uuid>) -> StoreResult<Vec<ApiKey>> {
        self.inner.read().list_api_keys(org_id, user_id)
    }

    async fn get_api_key_by_prefix(&self, prefix: &str) -> StoreResult<ApiKey> {
        self.inner.read().get_api_key_by_prefix(prefix)
    }

    async fn revoke_api_key(&self, org_id: Uuid, id: Uuid) -> StoreResult<()> {
        self.inner.write().revoke_api_key(org_id, id)
    }

    async fn list_recommendations(
        &self,
        org_id: Uuid,
        filter: &RecommendationFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Recommendation>> {
        self.inner.read().list_recommendations(org_id, filter, page)
    }

    async fn create_recommendations(&self, recs: Vec<NewRecommendation>) -> StoreResult<Vec<Recommendation>> {
        self.inner.write().create_recommendations(recs)
    }

    async fn get_recommendation(&self, org_id: Uuid, id: Uuid) -> StoreResult<Recommendation> {
        self.inner.read().get_recommendation(org_id, id)
    }

    async fn apply_recommendation(&self, org_id: Uuid, id: Uuid, created_pool_id: i64) -> StoreResult<Recommendation> {
        self.inner.write().apply_recommendation(org_id, id, created_pool_id)
    }

    async fn dismiss_recommendation(&self, org_id: Uuid, id: Uuid, reason: Option<String>) -> StoreResult<Recommendation> {
        self.inner.write().dismiss_recommendation(org_id, id, reason)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_core::model::{PoolSource, PoolStatus, PoolType, DEFAULT_ORG_ID};
    use std::collections::HashMap;

    fn new_pool(cidr: &str, parent_id: Option<i64>) -> NewPool {
        NewPool {
            org_id: DEFAULT_ORG_ID,
            name: cidr.to_string(),
            cidr: cidr.to_string(),
            parent_id,
            account_id: None,
            pool_type: PoolType::Supernet,
            status: PoolStatus::Active,
            source: PoolSource::Manual,
            description: None,
            tags: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn create_then_stats_rollup_matches_scenario_one() {
        let store = MemoryStore::new();
        let supernet = store.create_pool(new_pool("10.0.0.0/8", None)).await.unwrap();
        store
            .create_pool(new_pool("10.1.0.0/16", Some(supernet.id)))
            .await
            .unwrap();

        let (_pool, stats) = store.get_pool_with_stats(DEFAULT_ORG_ID, supernet.id).await.unwrap();
        assert_eq!(stats.total_ips, 16_777_216);
        assert_eq!(stats.used_ips, 65_536);
        assert_eq!(stats.available_ips, 16_711_680);
        assert_eq!(stats.direct_children, 1);
    }

    #[tokio::test]
    async fn overlapping_sibling_create_is_conflict() {
        let store = MemoryStore::new();
        let supernet = store.create_pool(new_pool("10.0.0.0/8", None)).await.unwrap();
        store
            .create_pool(new_pool("10.1.0.0/16", Some(supernet.id)))
            .await
            .unwrap();

        let err = store
            .create_pool(new_pool("10.1.128.0/17", Some(supernet.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, cloudpam_store::StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_refuses_while_children_exist() {
        let store = MemoryStore::new();
        let supernet = store.create_pool(new_pool("10.0.0.0/8", None)).await.unwrap();
        store
            .create_pool(new_pool("10.1.0.0/16", Some(supernet.id)))
            .await
            .unwrap();

        let err = store.delete_pool(DEFAULT_ORG_ID, supernet.id).await.unwrap_err();
        assert!(matches!(err, cloudpam_store::StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn cascade_delete_removes_whole_subtree() {
        let store = MemoryStore::new();
        let supernet = store.create_pool(new_pool("10.0.0.0/8", None)).await.unwrap();
        let region = store
            .create_pool(new_pool("10.1.0.0/16", Some(supernet.id)))
            .await
            .unwrap();

        let deleted = store.cascade_delete_pool(DEFAULT_ORG_ID, supernet.id).await.unwrap();
        assert_eq!(deleted.len(), 2);
        assert!(store.get_pool(DEFAULT_ORG_ID, region.id).await.is_err());
    }

    #[tokio::test]
    async fn ingest_is_idempotent_and_reconciles_to_deleted() {
        use cloudpam_core::model::{IncomingResource, Provider, ResourceType};

        let store = MemoryStore::new();
        let account = store
            .create_account(NewAccount {
                org_id: DEFAULT_ORG_ID,
                key: "aws:123456789012".into(),
                name: "prod".into(),
                external_id: None,
                description: None,
                platform: None,
                tier: None,
                environment: None,
                regions: vec![],
            })
            .await
            .unwrap();

        let incoming = vec![IncomingResource {
            provider: Provider::Aws,
            region: "us-east-1".into(),
            resource_type: ResourceType::Subnet,
            resource_id: "sn-1".into(),
            name: None,
            cidr: Some("10.1.0.0/24".into()),
            parent_resource_id: None,
            metadata: HashMap::new(),
        }];

        let now = Utc::now();
        let first = store
            .ingest_resources(DEFAULT_ORG_ID, account.id, incoming.clone(), now)
            .await
            .unwrap();
        assert_eq!(first.created, 1);

        let second = store
            .ingest_resources(DEFAULT_ORG_ID, account.id, incoming, now)
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 1);

        let stale = store
            .ingest_resources(DEFAULT_ORG_ID, account.id, vec![], now)
            .await
            .unwrap();
        assert_eq!(stale.found, 0);

        let resources = store
            .list_discovered_resources(DEFAULT_ORG_ID, &DiscoveredResourceFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(
            resources.items[0].status,
            cloudpam_core::model::ResourceStatus::Stale
        );

        store
            .ingest_resources(DEFAULT_ORG_ID, account.id, vec![], now)
            .await
            .unwrap();
        let resources = store
            .list_discovered_resources(DEFAULT_ORG_ID, &DiscoveredResourceFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(
            resources.items[0].status,
            cloudpam_core::model::ResourceStatus::Deleted
        );
    }
}
