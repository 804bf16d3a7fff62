use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use cloudpam_core::model::{
    BootstrapToken, DiscoveredResource, DiscoveryAgent, IncomingResource, ResourceStatus, SyncJob,
    SyncJobCounters,
};
use cloudpam_store::{AgentFilter, DiscoveredResourceFilter, Page, PageRequest, StoreError, StoreResult};

use crate::conv;
use crate::entities::account::{self, Entity as AccountEntity};
use crate::entities::bootstrap_token::{self, Entity as BootstrapTokenEntity};
use crate::entities::discovered_resource::{self, Entity as ResourceEntity};
use crate::entities::discovery_agent::{self, Entity as AgentEntity};
use crate::entities::sync_job::{self, Entity as SyncJobEntity};

async fn org_account_ids(db: &DatabaseConnection, org_id: Uuid) -> StoreResult<HashSet<i64>> {
    let rows = AccountEntity::find()
        .filter(account::Column::OrgId.eq(org_id))
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(rows.into_iter().map(|a| a.id).collect())
}

pub(crate) async fn list_discovered_resources(db: &DatabaseConnection, org_id: Uuid, filter: &DiscoveredResourceFilter, page: PageRequest) -> StoreResult<Page<DiscoveredResource>> {
    let accounts = org_account_ids(db, org_id).await?;
    let rows = ResourceEntity::find()
        .order_by_asc(discovered_resource::Column::Id)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let mut matched: Vec<DiscoveredResource> = rows
        .into_iter()
        .filter(|r| accounts.contains(&r.account_id))
        .map(conv::resource_from_model)
        .collect::<StoreResult<Vec<_>>>()?;
    matched.retain(|r| filter.account_id.is_none_or(|a| r.account_id == a));
    matched.retain(|r| filter.provider.is_none_or(|p| r.provider == p));
    matched.retain(|r| filter.resource_type.is_none_or(|t| r.resource_type == t));
    matched.retain(|r| match filter.linked_pool_id {
        Some(Some(pid)) => r.linked_pool_id == Some(pid),
        Some(None) => r.linked_pool_id.is_none(),
        None => true,
    });

    let total = matched.len() as u64;
    let items = matched.into_iter().skip(page.offset() as usize).take(page.page_size as usize).collect();
    Ok(Page::new(items, total, page.page, page.page_size))
}

pub(crate) async fn link_resource(db: &DatabaseConnection, org_id: Uuid, resource_id: Uuid, pool_id: Option<i64>) -> StoreResult<DiscoveredResource> {
    if let Some(pid) = pool_id {
        crate::pools::get_pool(db, org_id, pid).await?;
    }
    let row = ResourceEntity::find_by_id(resource_id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    let mut active: discovered_resource::ActiveModel = row.into();
    active.linked_pool_id = Set(pool_id);
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::resource_from_model(row)
}

pub(crate) async fn list_agents(db: &DatabaseConnection, org_id: Uuid, filter: &AgentFilter) -> StoreResult<Vec<DiscoveryAgent>> {
    let now = Utc::now();
    let accounts = org_account_ids(db, org_id).await?;
    let rows = AgentEntity::find()
        .order_by_asc(discovery_agent::Column::Id)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let mut agents: Vec<DiscoveryAgent> = rows
        .into_iter()
        .filter(|a| accounts.contains(&a.account_id))
        .map(conv::agent_from_model)
        .collect::<StoreResult<Vec<_>>>()?;
    agents.retain(|a| filter.account_id.is_none_or(|acc| a.account_id == acc));
    agents.retain(|a| filter.health.is_none_or(|h| a.health(now) == h));
    Ok(agents)
}

pub(crate) async fn create_agent(db: &DatabaseConnection, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
    let active = discovery_agent::ActiveModel {
        id: Set(agent.id),
        name: Set(agent.name.clone()),
        account_id: Set(agent.account_id),
        api_key_id: Set(agent.api_key_id),
        approval_status: Set(conv::approval_status_to_str(agent.approval_status).to_owned()),
        bootstrap_token_id: Set(agent.bootstrap_token_id),
        version: Set(agent.version.clone()),
        hostname: Set(agent.hostname.clone()),
        last_seen_at: Set(agent.last_seen_at),
        approved_at: Set(agent.approved_at),
        approved_by: Set(agent.approved_by),
    };
    let row = active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::agent_from_model(row)
}

pub(crate) async fn get_agent(db: &DatabaseConnection, org_id: Uuid, id: Uuid) -> StoreResult<DiscoveryAgent> {
    let row = AgentEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    crate::accounts::get_account(db, org_id, row.account_id).await?;
    conv::agent_from_model(row)
}

pub(crate) async fn update_agent(db: &DatabaseConnection, org_id: Uuid, agent: DiscoveryAgent) -> StoreResult<DiscoveryAgent> {
    get_agent(db, org_id, agent.id).await?;
    let active = discovery_agent::ActiveModel {
        id: Set(agent.id),
        name: Set(agent.name.clone()),
        account_id: Set(agent.account_id),
        api_key_id: Set(agent.api_key_id),
        approval_status: Set(conv::approval_status_to_str(agent.approval_status).to_owned()),
        bootstrap_token_id: Set(agent.bootstrap_token_id),
        version: Set(agent.version.clone()),
        hostname: Set(agent.hostname.clone()),
        last_seen_at: Set(agent.last_seen_at),
        approved_at: Set(agent.approved_at),
        approved_by: Set(agent.approved_by),
    };
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::agent_from_model(row)
}

pub(crate) async fn heartbeat_agent(db: &DatabaseConnection, org_id: Uuid, id: Uuid, now: DateTime<Utc>) -> StoreResult<DiscoveryAgent> {
    let row = AgentEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    crate::accounts::get_account(db, org_id, row.account_id).await?;
    let mut active: discovery_agent::ActiveModel = row.into();
    active.last_seen_at = Set(now);
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::agent_from_model(row)
}

pub(crate) async fn create_sync_job(db: &DatabaseConnection, job: SyncJob) -> StoreResult<SyncJob> {
    let active = sync_job::ActiveModel {
        id: Set(job.id),
        account_id: Set(job.account_id),
        status: Set(conv::sync_status_to_str(job.status).to_owned()),
        source: Set(conv::sync_source_to_str(job.source).to_owned()),
        agent_id: Set(job.agent_id),
        started_at: Set(job.started_at),
        finished_at: Set(job.finished_at),
        found: Set(job.counters.found as i32),
        created: Set(job.counters.created as i32),
        updated: Set(job.counters.updated as i32),
        deleted: Set(job.counters.deleted as i32),
        error: Set(job.error.clone()),
    };
    let row = active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::sync_job_from_model(row)
}

pub(crate) async fn update_sync_job(db: &DatabaseConnection, _org_id: Uuid, job: SyncJob) -> StoreResult<SyncJob> {
    SyncJobEntity::find_by_id(job.id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    let active = sync_job::ActiveModel {
        id: Set(job.id),
        account_id: Set(job.account_id),
        status: Set(conv::sync_status_to_str(job.status).to_owned()),
        source: Set(conv::sync_source_to_str(job.source).to_owned()),
        agent_id: Set(job.agent_id),
        started_at: Set(job.started_at),
        finished_at: Set(job.finished_at),
        found: Set(job.counters.found as i32),
        created: Set(job.counters.created as i32),
        updated: Set(job.counters.updated as i32),
        deleted: Set(job.counters.deleted as i32),
        error: Set(job.error.clone()),
    };
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::sync_job_from_model(row)
}

pub(crate) async fn list_bootstrap_tokens(db: &DatabaseConnection, org_id: Uuid) -> StoreResult<Vec<BootstrapToken>> {
    let accounts = org_account_ids(db, org_id).await?;
    let rows = BootstrapTokenEntity::find()
        .order_by_asc(bootstrap_token::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(rows
        .into_iter()
        .filter(|t| t.account_id.is_none_or(|a| accounts.contains(&a)))
        .map(conv::bootstrap_token_from_model)
        .collect())
}

pub(crate) async fn create_bootstrap_token(db: &DatabaseConnection, token: BootstrapToken) -> StoreResult<BootstrapToken> {
    let active = bootstrap_token::ActiveModel {
        id: Set(token.id),
        name: Set(token.name.clone()),
        token_hash: Set(token.token_hash.clone()),
        account_id: Set(token.account_id),
        created_by: Set(token.created_by),
        expires_at: Set(token.expires_at),
        revoked: Set(token.revoked),
        used_count: Set(token.used_count as i32),
        max_uses: Set(token.max_uses.map(|v| v as i32)),
        created_at: Set(token.created_at),
    };
    let row = active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(conv::bootstrap_token_from_model(row))
}

pub(crate) async fn get_bootstrap_token_by_hash(db: &DatabaseConnection, token_hash: &str) -> StoreResult<BootstrapToken> {
    let row = BootstrapTokenEntity::find()
        .filter(bootstrap_token::Column::TokenHash.eq(token_hash))
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    Ok(conv::bootstrap_token_from_model(row))
}

pub(crate) async fn update_bootstrap_token(db: &DatabaseConnection, _org_id: Uuid, token: BootstrapToken) -> StoreResult<BootstrapToken> {
    BootstrapTokenEntity::find_by_id(token.id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .ok_or(StoreError::NotFound)?;
    let active = bootstrap_token::ActiveModel {
        id: Set(token.id),
        name: Set(token.name.clone()),
        token_hash: Set(token.token_hash.clone()),
        account_id: Set(token.account_id),
        created_by: Set(token.created_by),
        expires_at: Set(token.expires_at),
        revoked: Set(token.revoked),
        used_count: Set(token.used_count as i32),
        max_uses: Set(token.max_uses.map(|v| v as i32)),
        created_at: Set(token.created_at),
    };
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    Ok(conv::bootstrap_token_from_model(row))
}

/// Upsert-then-stale-then-tombstone reconciliation: a resource present in
/// `incoming` is created or refreshed; a resource not present is marked
/// stale on its first missing ingest and deleted on its second.
pub(crate) async fn ingest_resources(db: &DatabaseConnection, _org_id: Uuid, account_id: i64, incoming: Vec<IncomingResource>, now: DateTime<Utc>) -> StoreResult<SyncJobCounters> {
    let mut counters = SyncJobCounters::default();
    let mut seen_keys = HashSet::new();

    let existing_rows = ResourceEntity::find()
        .filter(discovered_resource::Column::AccountId.eq(account_id))
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let mut existing: Vec<DiscoveredResource> = existing_rows
        .into_iter()
        .map(conv::resource_from_model)
        .collect::<StoreResult<Vec<_>>>()?;

    for item in incoming {
        counters.found += 1;
        let key = (item.provider, item.resource_type, item.resource_id.clone());
        seen_keys.insert(key.clone());

        let found = existing.iter_mut().find(|r| {
            r.provider == item.provider && r.resource_type == item.resource_type && r.resource_id == item.resource_id
        });

        if let Some(found) = found {
            found.name = item.name;
            found.cidr = item.cidr;
            found.parent_resource_id = item.parent_resource_id;
            found.metadata = item.metadata;
            found.status = ResourceStatus::Active;
            found.last_seen_at = now;
            let active = discovered_resource::ActiveModel {
                id: Set(found.id),
                account_id: Set(found.account_id),
                provider: Set(conv::provider_to_str(found.provider).to_owned()),
                region: Set(found.region.clone()),
                resource_type: Set(conv::resource_type_to_str(found.resource_type).to_owned()),
                resource_id: Set(found.resource_id.clone()),
                name: Set(found.name.clone()),
                cidr: Set(found.cidr.clone()),
                parent_resource_id: Set(found.parent_resource_id.clone()),
                linked_pool_id: Set(found.linked_pool_id),
                status: Set(conv::resource_status_to_str(found.status).to_owned()),
                metadata: Set(serde_json::to_value(&found.metadata).unwrap_or_default()),
                discovered_at: Set(found.discovered_at),
                last_seen_at: Set(found.last_seen_at),
            };
            active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
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
            let active = discovered_resource::ActiveModel {
                id: Set(resource.id),
                account_id: Set(resource.account_id),
                provider: Set(conv::provider_to_str(resource.provider).to_owned()),
                region: Set(resource.region.clone()),
                resource_type: Set(conv::resource_type_to_str(resource.resource_type).to_owned()),
                resource_id: Set(resource.resource_id.clone()),
                name: Set(resource.name.clone()),
                cidr: Set(resource.cidr.clone()),
                parent_resource_id: Set(resource.parent_resource_id.clone()),
                linked_pool_id: Set(resource.linked_pool_id),
                status: Set(conv::resource_status_to_str(resource.status).to_owned()),
                metadata: Set(serde_json::to_value(&resource.metadata).unwrap_or_default()),
                discovered_at: Set(resource.discovered_at),
                last_seen_at: Set(resource.last_seen_at),
            };
            active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
            existing.push(resource);
            counters.created += 1;
        }
    }

    for resource in existing.iter_mut() {
        let key = (resource.provider, resource.resource_type, resource.resource_id.clone());
        if seen_keys.contains(&key) {
            continue;
        }
        let next_status = match resource.status {
            ResourceStatus::Active => ResourceStatus::Stale,
            ResourceStatus::Stale => {
                counters.deleted += 1;
                ResourceStatus::Deleted
            }
            ResourceStatus::Deleted => continue,
        };
        resource.status = next_status;
        resource.last_seen_at = now;
        let active = discovered_resource::ActiveModel {
            id: Set(resource.id),
            status: Set(conv::resource_status_to_str(resource.status).to_owned()),
            last_seen_at: Set(resource.last_seen_at),
            ..Default::default()
        };
        active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    }

    Ok(counters)
}
