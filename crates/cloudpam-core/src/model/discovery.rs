use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Vpc,
    Subnet,
    NetworkInterface,
    ElasticIp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Active,
    Stale,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredResource {
    pub id: Uuid,
    pub account_id: i64,
    pub provider: Provider,
    pub region: String,
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

#[derive(Debug, Clone)]
pub struct IncomingResource {
    pub provider: Provider,
    pub region: String,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub name: Option<String>,
    pub cidr: Option<String>,
    pub parent_resource_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Local,
    Agent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncJobCounters {
    pub found: u32,
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    PendingApproval,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentHealth {
    Healthy,
    Stale,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryAgent {
    pub id: Uuid,
    pub name: String,
    pub account_id: i64,
    pub api_key_id: Option<Uuid>,
    pub approval_status: ApprovalStatus,
    pub bootstrap_token_id: Uuid,
    pub version: String,
    pub hostname: String,
    pub last_seen_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
}

impl DiscoveryAgent {
    /// Health is derived at read time from `last_seen_at`: healthy under
    /// 5 minutes, stale under 15 minutes, offline beyond that.
    #[must_use]
    pub fn health(&self, now: DateTime<Utc>) -> AgentHealth {
        let age = now.signed_duration_since(self.last_seen_at);
        if age < chrono::Duration::minutes(5) {
            AgentHealth::Healthy
        } else if age < chrono::Duration::minutes(15) {
            AgentHealth::Stale
        } else {
            AgentHealth::Offline
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapToken {
    pub id: Uuid,
    pub name: String,
    pub token_hash: String,
    pub account_id: Option<i64>,
    pub created_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub used_count: u32,
    pub max_uses: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl BootstrapToken {
    /// Valid iff not revoked, not expired, and under its use cap.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.revoked {
            return false;
        }
        if let Some(expires_at) = self.expires_at {
            if now >= expires_at {
                return false;
            }
        }
        if let Some(max_uses) = self.max_uses {
            if self.used_count >= max_uses {
                return false;
            }
        }
        true
    }

    #[must_use]
    pub fn is_account_compatible(&self, account_id: i64) -> bool {
        self.account_id.is_none_or(|bound| bound == account_id)
    }
}
