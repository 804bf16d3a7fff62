use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloudpam_core::model::{
    AgentHealth, ApprovalStatus, BootstrapToken, DiscoveredResource, DiscoveryAgent, IncomingResource, Provider,
    ResourceStatus, ResourceType, SyncJob, SyncJobCounters, SyncJobStatus, SyncSource,
};

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingResourceRequest {
    pub provider: Provider,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub resource_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub parent_resource_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl From<IncomingResourceRequest> for IncomingResource {
    fn from(r: IncomingResourceRequest) -> Self {
        IncomingResource {
            provider: r.provider,
            region: r.region,
            resource_type: r.resource_type,
            resource_id: r.resource_id,
            name: r.name,
            cidr: r.cidr,
            parent_resource_id: r.parent_resource_id,
            metadata: r.metadata,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub account_id: i64,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub resources: Vec<IncomingResourceRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncJobResponse {
    pub id: Uuid,
    pub account_id: i64,
    pub status: SyncJobStatus,
    pub source: SyncSource,
    pub agent_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counters: SyncJobCounters,
    pub error: Option<String>,
}

impl From<SyncJob> for SyncJobResponse {
    fn from(j: SyncJob) -> Self {
        Self {
            id: j.id,
            account_id: j.account_id,
            status: j.status,
            source: j.source,
            agent_id: j.agent_id,
            started_at: j.started_at,
            finished_at: j.finished_at,
            counters: j.counters,
            error: j.error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredResourceResponse {
    pub id: Uuid,
    pub account_id: i64,
    pub provider: Provider,
    pub region: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub name: Option<String>,
    pub cidr: Option<String>,
    pub parent_resource_id: Option<String>,
    pub linked_pool_id: Option<i64>,
    pub status: ResourceStatus,
    pub metadata: HashMap<String, String>,
    pub discovered_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl From<DiscoveredResource> for DiscoveredResourceResponse {
    fn from(r: DiscoveredResource) -> Self {
        Self {
            id: r.id,
            account_id: r.account_id,
            provider: r.provider,
            region: r.region,
            resource_type: r.resource_type,
            resource_id: r.resource_id,
            name: r.name,
            cidr: r.cidr,
            parent_resource_id: r.parent_resource_id,
            linked_pool_id: r.linked_pool_id,
            status: r.status,
            metadata: r.metadata,
            discovered_at: r.discovered_at,
            last_seen_at: r.last_seen_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    pub account_id: i64,
    pub token: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterAgentResponse {
    pub agent_id: Uuid,
    pub api_key: Option<String>,
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatRequest {
    pub agent_id: Uuid,
    #[serde(default)]
    pub name: String,
    pub account_id: i64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub hostname: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub id: Uuid,
    pub name: String,
    pub account_id: i64,
    pub approval_status: ApprovalStatus,
    pub health: AgentHealth,
    pub version: String,
    pub hostname: String,
    pub last_seen_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl AgentResponse {
    #[must_use]
    pub fn from_agent(agent: DiscoveryAgent, now: DateTime<Utc>) -> Self {
        let health = agent.health(now);
        Self {
            id: agent.id,
            name: agent.name,
            account_id: agent.account_id,
            approval_status: agent.approval_status,
            health,
            version: agent.version,
            hostname: agent.hostname,
            last_seen_at: agent.last_seen_at,
            approved_at: agent.approved_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBootstrapTokenRequest {
    pub name: String,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapTokenResponse {
    pub id: Uuid,
    pub name: String,
    pub account_id: Option<i64>,
    pub max_uses: Option<u32>,
    pub used_count: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<BootstrapToken> for BootstrapTokenResponse {
    fn from(t: BootstrapToken) -> Self {
        Self {
            id: t.id,
            name: t.name,
            account_id: t.account_id,
            max_uses: t.max_uses,
            used_count: t.used_count,
            expires_at: t.expires_at,
            revoked: t.revoked,
            created_at: t.created_at,
        }
    }
}

/// Only returned once, at creation — the raw token is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedBootstrapTokenResponse {
    #[serde(flatten)]
    pub token: BootstrapTokenResponse,
    pub raw_token: String,
}
