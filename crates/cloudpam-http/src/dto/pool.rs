use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloudpam_cidr::Cidr;
use cloudpam_core::error::{Error as CoreError, Kind};
use cloudpam_core::model::{NewPool, Pool, PoolSource, PoolStats, PoolStatus, PoolType, PoolUpdate};

#[derive(Debug, Clone, Serialize)]
pub struct PoolResponse {
    pub id: i64,
    pub org_id: Uuid,
    pub name: String,
    pub cidr: String,
    pub parent_id: Option<i64>,
    pub account_id: Option<i64>,
    pub pool_type: PoolType,
    pub status: PoolStatus,
    pub source: PoolSource,
    pub description: Option<String>,
    pub tags: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Pool> for PoolResponse {
    fn from(p: Pool) -> Self {
        Self {
            id: p.id,
            org_id: p.org_id,
            name: p.name,
            cidr: p.cidr.to_string(),
            parent_id: p.parent_id,
            account_id: p.account_id,
            pool_type: p.pool_type,
            status: p.status,
            source: p.source,
            description: p.description,
            tags: p.tags,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolNodeResponse {
    pub pool: PoolResponse,
    pub children: Vec<PoolNodeResponse>,
}

impl From<cloudpam_core::model::PoolNode> for PoolNodeResponse {
    fn from(n: cloudpam_core::model::PoolNode) -> Self {
        Self {
            pool: n.pool.into(),
            children: n.children.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolStatsResponse {
    pub total_ips: u64,
    pub used_ips: u64,
    pub available_ips: u64,
    pub utilization_pct: f64,
    pub direct_children: u32,
    pub child_count: u32,
}

impl From<PoolStats> for PoolStatsResponse {
    fn from(s: PoolStats) -> Self {
        Self {
            total_ips: s.total_ips,
            used_ips: s.used_ips,
            available_ips: s.available_ips,
            utilization_pct: s.utilization_pct,
            direct_children: s.direct_children,
            child_count: s.child_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockResponse {
    pub cidr: String,
    pub assigned_pool_id: Option<i64>,
}

impl From<cloudpam_core::model::Block> for BlockResponse {
    fn from(b: cloudpam_core::model::Block) -> Self {
        Self { cidr: b.cidr.to_string(), assigned_pool_id: b.assigned_pool_id }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePoolRequest {
    pub name: String,
    pub cidr: String,
    pub parent_id: Option<i64>,
    pub account_id: Option<i64>,
    pub pool_type: PoolType,
    #[serde(default)]
    pub status: Option<PoolStatus>,
    #[serde(default)]
    pub source: Option<PoolSource>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl CreatePoolRequest {
    pub fn into_new_pool(self, org_id: Uuid) -> Result<NewPool, CoreError> {
        Ok(NewPool {
            org_id,
            name: self.name,
            cidr: self.cidr,
            parent_id: self.parent_id,
            account_id: self.account_id,
            pool_type: self.pool_type,
            status: self.status.unwrap_or(PoolStatus::Active),
            source: self.source.unwrap_or(PoolSource::Manual),
            description: self.description,
            tags: self.tags,
        })
    }
}

/// Mutable fields of `PATCH /pools/{id}`. Omitted fields are left
/// unchanged; there is no way to explicitly clear `description` back to
/// `null` in one call — send a fresh empty string instead.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdatePoolRequest {
    pub name: Option<String>,
    pub account_id: Option<i64>,
    pub pool_type: Option<PoolType>,
    pub status: Option<PoolStatus>,
    pub description: Option<String>,
    pub tags: Option<HashMap<String, String>>,
}

impl From<UpdatePoolRequest> for PoolUpdate {
    fn from(u: UpdatePoolRequest) -> Self {
        PoolUpdate {
            name: u.name,
            account_id: u.account_id.map(Some),
            pool_type: u.pool_type,
            status: u.status,
            description: u.description.map(Some),
            tags: u.tags,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlocksQuery {
    pub new_prefix_len: u8,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlocksResponse {
    pub items: Vec<BlockResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Parses a free-standing CIDR query/body string, for endpoints that take
/// one outside a larger DTO (search, analysis).
pub fn parse_cidr(raw: &str) -> Result<Cidr, CoreError> {
    Cidr::from_str(raw).map_err(|e| CoreError::new(Kind::Validation, e.to_string()))
}
