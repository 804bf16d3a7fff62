use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use cloudpam_core::model::PoolType;
use cloudpam_engine::schema_plan::{SchemaPlanItem, SchemaPlanResult, SchemaPlanRowOutcome};

use super::pool::PoolResponse;

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaPlanItemRequest {
    pub temp_id: String,
    pub name: String,
    pub cidr: String,
    pub pool_type: PoolType,
    #[serde(default)]
    pub parent_temp_id: Option<String>,
    #[serde(default)]
    pub account_key: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl From<SchemaPlanItemRequest> for SchemaPlanItem {
    fn from(i: SchemaPlanItemRequest) -> Self {
        SchemaPlanItem {
            temp_id: i.temp_id,
            name: i.name,
            cidr: i.cidr,
            pool_type: i.pool_type,
            parent_temp_id: i.parent_temp_id,
            account_key: i.account_key,
            tags: i.tags,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaCheckRequest {
    pub items: Vec<SchemaPlanItemRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaApplyRequest {
    pub items: Vec<SchemaPlanItemRequest>,
    #[serde(default)]
    pub skip_conflicts: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaPlanRowResponse {
    pub temp_id: String,
    pub pool: Option<PoolResponse>,
    pub error: Option<String>,
}

impl From<SchemaPlanRowOutcome> for SchemaPlanRowResponse {
    fn from(r: SchemaPlanRowOutcome) -> Self {
        Self { temp_id: r.temp_id, pool: r.pool.map(Into::into), error: r.error }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaPlanResponse {
    pub all_ok: bool,
    pub rows: Vec<SchemaPlanRowResponse>,
}

impl From<SchemaPlanResult> for SchemaPlanResponse {
    fn from(r: SchemaPlanResult) -> Self {
        Self { all_ok: r.all_ok(), rows: r.rows.into_iter().map(Into::into).collect() }
    }
}
