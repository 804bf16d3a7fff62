//! Conversions between sea-orm row models (plain strings/JSON) and the
//! strongly typed domain model in `cloudpam_core`.

use std::collections::HashMap;

use cloudpam_core::model::{
    Account, AgentHealth, ApiKey, ApprovalStatus, AuditAction, AuditEvent, ActorType,
    BootstrapToken, DiscoveredResource, DiscoveryAgent, Pool, PoolSource, PoolStatus, PoolType,
    Provider, Recommendation, RecommendationPriority, RecommendationStatus, RecommendationType,
    ResourceStatus, ResourceType, Session, SyncJob, SyncJobCounters, SyncJobStatus, SyncSource,
    User,
};
use cloudpam_store::{StoreError, StoreResult};

use crate::entities::{account, api_key, audit_event, bootstrap_token, discovered_resource, discovery_agent, pool, recommendation, session, sync_job, user};

fn bad(field: &str, value: &str) -> StoreError {
    StoreError::Internal(format!("invalid stored value for {field}: {value}"))
}

pub fn pool_type_to_str(v: PoolType) -> &'static str {
    match v {
        PoolType::Supernet => "supernet",
        PoolType::Region => "region",
        PoolType::Environment => "environment",
        PoolType::Vpc => "vpc",
        PoolType::Subnet => "subnet",
    }
}

pub fn pool_type_from_str(v: &str) -> StoreResult<PoolType> {
    Ok(match v {
        "supernet" => PoolType::Supernet,
        "region" => PoolType::Region,
        "environment" => PoolType::Environment,
        "vpc" => PoolType::Vpc,
        "subnet" => PoolType::Subnet,
        other => return Err(bad("pool_type", other)),
    })
}

pub fn pool_status_to_str(v: PoolStatus) -> &'static str {
    match v {
        PoolStatus::Planned => "planned",
        PoolStatus::Active => "active",
        PoolStatus::Deprecated => "deprecated",
    }
}

pub fn pool_status_from_str(v: &str) -> StoreResult<PoolStatus> {
    Ok(match v {
        "planned" => PoolStatus::Planned,
        "active" => PoolStatus::Active,
        "deprecated" => PoolStatus::Deprecated,
        other => return Err(bad("pool_status", other)),
    })
}

pub fn pool_source_to_str(v: PoolSource) -> &'static str {
    match v {
        PoolSource::Manual => "manual",
        PoolSource::Discovered => "discovered",
        PoolSource::Imported => "imported",
    }
}

pub fn pool_source_from_str(v: &str) -> StoreResult<PoolSource> {
    Ok(match v {
        "manual" => PoolSource::Manual,
        "discovered" => PoolSource::Discovered,
        "imported" => PoolSource::Imported,
        other => return Err(bad("pool_source", other)),
    })
}

pub fn provider_to_str(v: Provider) -> &'static str {
    v.as_key_prefix()
}

pub fn provider_from_str(v: &str) -> StoreResult<Provider> {
    Ok(match v {
        "aws" => Provider::Aws,
        "gcp" => Provider::Gcp,
        "azure" => Provider::Azure,
        "onprem" => Provider::Onprem,
        other => return Err(bad("provider", other)),
    })
}

pub fn resource_type_to_str(v: ResourceType) -> &'static str {
    match v {
        ResourceType::Vpc => "vpc",
        ResourceType::Subnet => "subnet",
        ResourceType::NetworkInterface => "network_interface",
        ResourceType::ElasticIp => "elastic_ip",
    }
}

pub fn resource_type_from_str(v: &str) -> StoreResult<ResourceType> {
    Ok(match v {
        "vpc" => ResourceType::Vpc,
        "subnet" => ResourceType::Subnet,
        "network_interface" => ResourceType::NetworkInterface,
        "elastic_ip" => ResourceType::ElasticIp,
        other => return Err(bad("resource_type", other)),
    })
}

pub fn resource_status_to_str(v: ResourceStatus) -> &'static str {
    match v {
        ResourceStatus::Active => "active",
        ResourceStatus::Stale => "stale",
        ResourceStatus::Deleted => "deleted",
    }
}

pub fn resource_status_from_str(v: &str) -> StoreResult<ResourceStatus> {
    Ok(match v {
        "active" => ResourceStatus::Active,
        "stale" => ResourceStatus::Stale,
        "deleted" => ResourceStatus::Deleted,
        other => return Err(bad("resource_status", other)),
    })
}

pub fn sync_status_to_str(v: SyncJobStatus) -> &'static str {
    match v {
        SyncJobStatus::Pending => "pending",
        SyncJobStatus::Running => "running",
        SyncJobStatus::Completed => "completed",
        SyncJobStatus::Failed => "failed",
    }
}

pub fn sync_status_from_str(v: &str) -> StoreResult<SyncJobStatus> {
    Ok(match v {
        "pending" => SyncJobStatus::Pending,
        "running" => SyncJobStatus::Running,
        "completed" => SyncJobStatus::Completed,
        "failed" => SyncJobStatus::Failed,
        other => return Err(bad("sync_status", other)),
    })
}

pub fn sync_source_to_str(v: SyncSource) -> &'static str {
    match v {
        SyncSource::Local => "local",
        SyncSource::Agent => "agent",
    }
}

pub fn sync_source_from_str(v: &str) -> StoreResult<SyncSource> {
    Ok(match v {
        "local" => SyncSource::Local,
        "agent" => SyncSource::Agent,
        other => return Err(bad("sync_source", other)),
    })
}

pub fn approval_status_to_str(v: ApprovalStatus) -> &'static str {
    match v {
        ApprovalStatus::PendingApproval => "pending_approval",
        ApprovalStatus::Approved => "approved",
        ApprovalStatus::Rejected => "rejected",
    }
}

pub fn approval_status_from_str(v: &str) -> StoreResult<ApprovalStatus> {
    Ok(match v {
        "pending_approval" => ApprovalStatus::PendingApproval,
        "approved" => ApprovalStatus::Approved,
        "rejected" => ApprovalStatus::Rejected,
        other => return Err(bad("approval_status", other)),
    })
}

pub fn actor_type_to_str(v: ActorType) -> &'static str {
    match v {
        ActorType::User => "user",
        ActorType::ApiKey => "api_key",
        ActorType::Agent => "agent",
        ActorType::Anonymous => "anonymous",
    }
}

pub fn actor_type_from_str(v: &str) -> StoreResult<ActorType> {
    Ok(match v {
        "user" => ActorType::User,
        "api_key" => ActorType::ApiKey,
        "agent" => ActorType::Agent,
        "anonymous" => ActorType::Anonymous,
        other => return Err(bad("actor_type", other)),
    })
}

pub fn audit_action_to_str(v: AuditAction) -> &'static str {
    match v {
        AuditAction::Create => "create",
        AuditAction::Update => "update",
        AuditAction::Delete => "delete",
        AuditAction::Login => "login",
        AuditAction::Logout => "logout",
        AuditAction::Register => "register",
        AuditAction::Approve => "approve",
        AuditAction::Reject => "reject",
        AuditAction::Apply => "apply",
        AuditAction::Dismiss => "dismiss",
    }
}

pub fn audit_action_from_str(v: &str) -> StoreResult<AuditAction> {
    Ok(match v {
        "create" => AuditAction::Create,
        "update" => AuditAction::Update,
        "delete" => AuditAction::Delete,
        "login" => AuditAction::Login,
        "logout" => AuditAction::Logout,
        "register" => AuditAction::Register,
        "approve" => AuditAction::Approve,
        "reject" => AuditAction::Reject,
        "apply" => AuditAction::Apply,
        "dismiss" => AuditAction::Dismiss,
        other => return Err(bad("audit_action", other)),
    })
}

pub fn recommendation_type_to_str(v: RecommendationType) -> &'static str {
    match v {
        RecommendationType::Allocation => "allocation",
        RecommendationType::Compliance => "compliance",
    }
}

pub fn recommendation_type_from_str(v: &str) -> StoreResult<RecommendationType> {
    Ok(match v {
        "allocation" => RecommendationType::Allocation,
        "compliance" => RecommendationType::Compliance,
        other => return Err(bad("recommendation_type", other)),
    })
}

pub fn recommendation_status_to_str(v: RecommendationStatus) -> &'static str {
    match v {
        RecommendationStatus::Pending => "pending",
        RecommendationStatus::Applied => "applied",
        RecommendationStatus::Dismissed => "dismissed",
    }
}

pub fn recommendation_status_from_str(v: &str) -> StoreResult<RecommendationStatus> {
    Ok(match v {
        "pending" => RecommendationStatus::Pending,
        "applied" => RecommendationStatus::Applied,
        "dismissed" => RecommendationStatus::Dismissed,
        other => return Err(bad("recommendation_status", other)),
    })
}

pub fn recommendation_priority_to_str(v: RecommendationPriority) -> &'static str {
    match v {
        RecommendationPriority::Low => "low",
        RecommendationPriority::Medium => "medium",
        RecommendationPriority::High => "high",
    }
}

pub fn recommendation_priority_from_str(v: &str) -> StoreResult<RecommendationPriority> {
    Ok(match v {
        "low" => RecommendationPriority::Low,
        "medium" => RecommendationPriority::Medium,
        "high" => RecommendationPriority::High,
        other => return Err(bad("recommendation_priority", other)),
    })
}

fn tags_from_json(v: serde_json::Value) -> HashMap<String, String> {
    serde_json::from_value(v).unwrap_or_default()
}

pub fn pool_from_model(m: pool::Model) -> StoreResult<Pool> {
    Ok(Pool {
        id: m.id,
        org_id: m.org_id,
        name: m.name,
        cidr: cloudpam_cidr::Cidr::parse(&m.cidr, true).map_err(|e| StoreError::Internal(e.to_string()))?,
        parent_id: m.parent_id,
        account_id: m.account_id,
        pool_type: pool_type_from_str(&m.pool_type)?,
        status: pool_status_from_str(&m.status)?,
        source: pool_source_from_str(&m.source)?,
        description: m.description,
        tags: tags_from_json(m.tags),
        created_at: m.created_at,
        updated_at: m.updated_at,
        deleted_at: m.deleted_at,
    })
}

pub fn account_from_model(m: account::Model) -> StoreResult<Account> {
    Ok(Account {
        id: m.id,
        org_id: m.org_id,
        key: m.key,
        name: m.name,
        provider: provider_from_str(&m.provider)?,
        external_id: m.external_id,
        description: m.description,
        platform: m.platform,
        tier: m.tier,
        environment: m.environment,
        regions: serde_json::from_value(m.regions).unwrap_or_default(),
        created_at: m.created_at,
        updated_at: m.updated_at,
        deleted_at: m.deleted_at,
    })
}

pub fn resource_from_model(m: discovered_resource::Model) -> StoreResult<DiscoveredResource> {
    Ok(DiscoveredResource {
        id: m.id,
        account_id: m.account_id,
        provider: provider_from_str(&m.provider)?,
        region: m.region,
        resource_type: resource_type_from_str(&m.resource_type)?,
        resource_id: m.resource_id,
        name: m.name,
        cidr: m.cidr,
        parent_resource_id: m.parent_resource_id,
        linked_pool_id: m.linked_pool_id,
        status: resource_status_from_str(&m.status)?,
        metadata: tags_from_json(m.metadata),
        discovered_at: m.discovered_at,
        last_seen_at: m.last_seen_at,
    })
}

pub fn sync_job_from_model(m: sync_job::Model) -> StoreResult<SyncJob> {
    Ok(SyncJob {
        id: m.id,
        account_id: m.account_id,
        status: sync_status_from_str(&m.status)?,
        source: sync_source_from_str(&m.source)?,
        agent_id: m.agent_id,
        started_at: m.started_at,
        finished_at: m.finished_at,
        counters: SyncJobCounters {
            found: m.found as u32,
            created: m.created as u32,
            updated: m.updated as u32,
            deleted: m.deleted as u32,
        },
        error: m.error,
    })
}

pub fn agent_from_model(m: discovery_agent::Model) -> StoreResult<DiscoveryAgent> {
    Ok(DiscoveryAgent {
        id: m.id,
        name: m.name,
        account_id: m.account_id,
        api_key_id: m.api_key_id,
        approval_status: approval_status_from_str(&m.approval_status)?,
        bootstrap_token_id: m.bootstrap_token_id,
        version: m.version,
        hostname: m.hostname,
        last_seen_at: m.last_seen_at,
        approved_at: m.approved_at,
        approved_by: m.approved_by,
    })
}

pub fn bootstrap_token_from_model(m: bootstrap_token::Model) -> BootstrapToken {
    BootstrapToken {
        id: m.id,
        name: m.name,
        token_hash: m.token_hash,
        account_id: m.account_id,
        created_by: m.created_by,
        expires_at: m.expires_at,
        revoked: m.revoked,
        used_count: m.used_count as u32,
        max_uses: m.max_uses.map(|v| v as u32),
        created_at: m.created_at,
    }
}

pub fn audit_event_from_model(m: audit_event::Model) -> StoreResult<AuditEvent> {
    Ok(AuditEvent {
        id: m.id,
        org_id: m.org_id,
        actor_type: actor_type_from_str(&m.actor_type)?,
        actor_id: m.actor_id,
        actor_label: m.actor_label,
        action: audit_action_from_str(&m.action)?,
        resource_type: m.resource_type,
        resource_id: m.resource_id,
        before: m.before,
        after: m.after,
        ip: m.ip,
        user_agent: m.user_agent,
        request_id: m.request_id,
        metadata: tags_from_json(m.metadata),
        occurred_at: m.occurred_at,
    })
}

pub fn user_from_model(m: user::Model) -> StoreResult<User> {
    Ok(User {
        id: m.id,
        org_id: m.org_id,
        username: m.username,
        email: m.email,
        display_name: m.display_name,
        role: role_from_str(&m.role)?,
        password_hash: m.password_hash,
        active: m.active,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

pub fn role_to_str(v: cloudpam_core::model::Role) -> &'static str {
    use cloudpam_core::model::Role;
    match v {
        Role::Admin => "admin",
        Role::Operator => "operator",
        Role::Viewer => "viewer",
        Role::Auditor => "auditor",
    }
}

pub fn role_from_str(v: &str) -> StoreResult<cloudpam_core::model::Role> {
    use cloudpam_core::model::Role;
    Ok(match v {
        "admin" => Role::Admin,
        "operator" => Role::Operator,
        "viewer" => Role::Viewer,
        "auditor" => Role::Auditor,
        other => return Err(bad("role", other)),
    })
}

pub fn session_from_model(m: session::Model) -> Session {
    Session {
        id: m.id,
        user_id: m.user_id,
        created_at: m.created_at,
        expires_at: m.expires_at,
        last_used_at: m.last_used_at,
        ip: m.ip.and_then(|s| s.parse().ok()),
        user_agent: m.user_agent,
    }
}

pub fn api_key_from_model(m: api_key::Model) -> StoreResult<ApiKey> {
    let scopes: Vec<String> = serde_json::from_value(m.scopes).unwrap_or_default();
    let scopes = scopes
        .iter()
        .filter_map(|s| parse_permission(s))
        .collect();
    Ok(ApiKey {
        id: m.id,
        org_id: m.org_id,
        name: m.name,
        prefix: m.prefix,
        secret_hash: m.secret_hash,
        scopes,
        created_by: m.created_by,
        expires_at: m.expires_at,
        created_at: m.created_at,
        last_used_at: m.last_used_at,
        revoked: m.revoked,
    })
}

fn parse_permission(s: &str) -> Option<cloudpam_core::model::auth::Permission> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
}

pub fn scopes_to_json(scopes: &[cloudpam_core::model::auth::Permission]) -> serde_json::Value {
    let strs: Vec<String> = scopes
        .iter()
        .filter_map(|p| serde_json::to_value(p).ok())
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();
    serde_json::to_value(strs).unwrap_or(serde_json::Value::Array(vec![]))
}

pub fn recommendation_from_model(m: recommendation::Model) -> StoreResult<Recommendation> {
    Ok(Recommendation {
        id: m.id,
        org_id: m.org_id,
        pool_id: m.pool_id,
        recommendation_type: recommendation_type_from_str(&m.recommendation_type)?,
        status: recommendation_status_from_str(&m.status)?,
        priority: recommendation_priority_from_str(&m.priority)?,
        title: m.title,
        description: m.description,
        suggested_cidr: m.suggested_cidr,
        rule_id: m.rule_id,
        score: m.score,
        metadata: tags_from_json(m.metadata),
        applied_pool_id: m.applied_pool_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
        resolved_at: m.resolved_at,
    })
}
