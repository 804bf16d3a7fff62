use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cloudpam_cidr::Cidr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolType {
    Supernet,
    Region,
    Environment,
    Vpc,
    Subnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Planned,
    Active,
    Deprecated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
    Manual,
    Discovered,
    Imported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: i64,
    pub org_id: uuid::Uuid,
    pub name: String,
    pub cidr: Cidr,
    pub parent_id: Option<i64>,
    pub account_id: Option<i64>,
    pub pool_type: PoolType,
    pub status: PoolStatus,
    pub source: PoolSource,
    pub description: Option<String>,
    pub tags: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Pool {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Fields accepted when creating a pool — everything the caller supplies
/// before ids/timestamps are assigned.
#[derive(Debug, Clone)]
pub struct NewPool {
    pub org_id: uuid::Uuid,
    pub name: String,
    pub cidr: String,
    pub parent_id: Option<i64>,
    pub account_id: Option<i64>,
    pub pool_type: PoolType,
    pub status: PoolStatus,
    pub source: PoolSource,
    pub description: Option<String>,
    pub tags: HashMap<String, String>,
}

/// Fields mutable via `PATCH /pools/{id}`.
#[derive(Debug, Clone, Default)]
pub struct PoolUpdate {
    pub name: Option<String>,
    pub account_id: Option<Option<i64>>,
    pub pool_type: Option<PoolType>,
    pub status: Option<PoolStatus>,
    pub description: Option<Option<String>>,
    pub tags: Option<HashMap<String, String>>,
}

/// Rolled-up utilization numbers for a pool, computed from its direct
/// children.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_ips: u64,
    pub used_ips: u64,
    pub available_ips: u64,
    pub utilization_pct: f64,
    pub direct_children: u32,
    pub child_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolNode {
    pub pool: Pool,
    pub children: Vec<PoolNode>,
}

/// One candidate/assigned subnet block under a pool, as returned by
/// `enumerateSubnets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub cidr: Cidr,
    pub assigned_pool_id: Option<i64>,
}

impl Block {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.assigned_pool_id.is_none()
    }
}
