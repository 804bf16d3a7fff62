use cloudpam_core::model::{AgentHealth, PoolSource, PoolStatus, PoolType, Provider, ResourceType};
use cloudpam_core::model::{AuditAction, RecommendationStatus, RecommendationType};
use chrono::{DateTime, Utc};
use cloudpam_cidr::Cidr;

#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    /// `Some(None)` means "roots only"; `None` means "don't filter by parent".
    pub parent_id: Option<Option<i64>>,
    pub account_id: Option<i64>,
    pub pool_type: Option<PoolType>,
    pub status: Option<PoolStatus>,
    pub source: Option<PoolSource>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub provider: Option<Provider>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResultKind {
    Pool,
    Account,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub cidr_contains: Option<Cidr>,
    pub cidr_within: Option<Cidr>,
    pub kind: Option<SearchResultKind>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveredResourceFilter {
    pub account_id: Option<i64>,
    pub provider: Option<Provider>,
    pub resource_type: Option<ResourceType>,
    pub linked_pool_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub account_id: Option<i64>,
    pub health: Option<AgentHealth>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub resource_type: Option<String>,
    pub actor_id: Option<uuid::Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub status: Option<RecommendationStatus>,
    pub recommendation_type: Option<RecommendationType>,
    pub pool_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockFilter {
    pub accounts: Vec<i64>,
    pub pools: Vec<i64>,
}
