use chrono::{DateTime, Utc};
use uuid::Uuid;

use cloudpam_core::model::{
    BootstrapToken, DiscoveredResource, DiscoveryAgent, IncomingResource, ResourceStatus, SyncJob,
    SyncJobCounters,
};
use cloudpam_store::{AgentFilter, DiscoveredResourceFilter, Page, PageRequest, StoreError, StoreResult};

use crate::state::Inner;

impl Inner {
    pub(crate) fn list_discovered_resources(
        &self,
        org_id: Uuid,
        filter: &DiscoveredResourceFilter,
        page: PageRequest,
    ) -> StoreResult<Page<DiscoveredResource>> {
        let accounts: std::collections::HashSet<i64> = self
            .accounts
            .values()
            .filter(|a| a.org_id == org_id)
            .map(|a| a.id)
            .collect();
        let mut matched: Vec<&DiscoveredResource> = self
            .resources
            .values()
            .filter(|r| accounts.contains(&r.account_id))
            .filter(|r| filter.account_id.is_none_or(|a| r.account_id == a))
            .filter(|r| filter.provider.is_none_or(|p| r.provider == p))
            .filter(|r| filter.resource_type.is_none_or(|t| r.resource_type == t))
            .filter(|r| match &filter.linked_pool_id {
                Some(Some(pid)) => r.linked_pool_id == Some(*pid),
                Some(None) => r.linked_pool_id.is_none(),
                None => true,
            })
            .collect();
        matched.sort_by_key(|r| r.id);
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, page.page, page.page_size))
    }

    pub(crate) fn link_resource(
        &mut self,
        org_id: Uuid,
        resource_id: Uuid,
        pool_id: Option<i64>,
    ) -> StoreResult<DiscoveredResource> {
        if let Some(pid) = pool_id {
            self.get_pool(org_id, pid)?;
        }
        let resource = self.resources.get_mut(&resource_id).ok_or(StoreError::NotFound)?;
        resource.linked_pool_id = pool_id;
        Ok(resource.clone())
    }

    pub(crate) fn list_agents(&self, org_id: Uuid, filter: &AgentFilter) -> StoreResult<Vec<DiscoveryAgent>> {
        let now = Inner::now();
        let accounts: std::collections::HashSet<i64> = self
            .accounts
            .values()
            .filter(|a| a.org_id == org_id)
            .map(|a| a.id)
            .collect();
        let mut agents: Vec<DiscoveryAgent> = self
            .agents
            .values()
            .filter(|a| accounts.contains(&a.account_id))
            .filter(|a| filter.account_id.is_none_or(|acc| a.account_id == acc))
            .filter(|a| filter.health.is_none_or(|h| a.health(now) == h))
            .cloned()
            .collect();
        agents.sort_by_key(|a| a.id);
        Ok(agents)
    }

    pub(crate) fn create_agent(&mut self, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
        self.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    pub(crate) fn get_agent(&self, org_id: Uuid, id: Uuid) -> StoreResult<DiscoveryAgent> {
        let agent = self.agents.get(&id).ok_or(StoreError::NotFound)?;
        self.get_account(org_id, agent.account_id)?;
        Ok(agent.clone())
    }

    pub(crate) fn update_agent(&mut self, org_id: Uuid, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
        self.get_agent(org_id, agent.id)?;
        self.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    pub(crate) fn heartbeat_agent(&mut self, org_id: Uuid, id: Uuid, now: DateTime<Utc>) -> StoreResult<DiscoveryAgent> {
        self.get_agent(org_id, id)?;
        let agent = self.agents.get_mut(&id).ok_or(StoreError::NotFound)?;
        agent.last_seen_at = now;
        Ok(agent.clone())
    }

    pub(crate) fn create_sync_job(&mut self, job: SyncJob) -> StoreResult<SyncJob> {
        self.sync_jobs.insert(job.id, job.clone());
        Ok(job)
    }

    pub(crate) fn update_sync_job(&mut self, _org_id: Uuid, job: SyncJob) -> StoreResult<SyncJob> {
        if !self.sync_jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound);
        }
        self.sync_jobs.insert(job.id, job.clone());
        Ok(job)
    }

    pub(crate) fn list_bootstrap_tokens(&self, org_id: Uuid) -> StoreResult<Vec<BootstrapToken>> {
        let accounts: std::collections::HashSet<i64> = self
            .accounts
            .values()
            .filter(|a| a.org_id == org_id)
            .map(|a| a.id)
            .collect();
        let mut tokens: Vec<_> = self
            .bootstrap_tokens
            .values()
            .filter(|t| t.account_id.is_none_or(|a| accounts.contains(&a)))
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        Ok(tokens)
    }

    pub(crate) fn create_bootstrap_token(
        &mut self,
        token: BootstrapToken,
    ) -> StoreResult<BootstrapToken> {
        self.bootstrap_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    pub(crate) fn get_bootstrap_token_by_hash(&self, token_hash: &str) -> StoreResult<BootstrapToken> {
        self.bootstrap_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub(crate) fn update_bootstrap_token(
        &mut self,
        _org_id: Uuid,
        token: BootstrapToken,
    ) -> StoreResult<BootstrapToken> {
        if !self.bootstrap_tokens.contains_key(&token.id) {
            return Err(StoreError::NotFound);
        }
        self.bootstrap_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    /// Upsert-then-stale-then-tombstone reconciliation: a resource present
    /// in `incoming` is created or refreshed; a resource not present is
    /// marked stale on its first missing ingest and deleted on its second.
    pub(crate) fn ingest_resources(
        &mut self,
        _org_id: Uuid,
        account_id: i64,
        incoming: Vec<IncomingResource>,
        now: DateTime<Utc>,
    ) -> StoreResult<SyncJobCounters> {
        let mut counters = SyncJobCounters::default();
        let mut seen_keys = std::collections::HashSet::new();

        for item in incoming {
            counters.found += 1;
            let key = (item.provider, item.resource_type, item.resource_id.clone());
            seen_keys.insert(key.clone());

            let existing = self.resources.values_mut().find(|r| {
                r.account_id == account_id
                    && r.provider == item.provider
                    && r.resource_type == item.resource_type
                    && r.resource_id == item.resource_id
            });

            if let Some(existing) = existing {
                existing.name = item.name;
                existing.cidr = item.cidr;
                existing.parent_resource_id = item.parent_resource_id;
                existing.metadata = item.metadata;
                existing.status = ResourceStatus::Active;
                existing.last_seen_at = now;
                counters.updated += 1;
            } else {
                let resource = DiscoveredResource {
                    id: Uuid::new_v4(),
                    account_id,
                    provider: item.provider,
                    region: item.region,
                    resource_type: item.resource_type,
                    resource_id: item.resource_id,
                    name: item.name,
                    cidr: item.cidr,
                    parent_resource_id: item.parent_resource_id,
                    linked_pool_id: None,
                    status: ResourceStatus::Active,
                    metadata: item.metadata,
                    discovered_at: now,
                    last_seen_at: now,
                };
                self.resources.insert(resource.id, resource);
                counters.created += 1;
            }
        }

        for resource in self.resources.values_mut() {
            if resource.account_id != account_id {
                continue;
            }
            let key = (resource.provider, resource.resource_type, resource.resource_id.clone());
            if seen_keys.contains(&key) {
                continue;
            }
            match resource.status {
                ResourceStatus::Active => {
                    resource.status = ResourceStatus::Stale;
                    resource.last_seen_at = now;
                }
                ResourceStatus::Stale => {
                    resource.status = ResourceStatus::Deleted;
                    resource.last_seen_at = now;
                    counters.deleted += 1;
                }
                ResourceStatus::Deleted => {}
            }
        }

        Ok(counters)
    }
}
