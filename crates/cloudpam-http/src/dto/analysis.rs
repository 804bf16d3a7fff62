use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use cloudpam_engine::analysis::FreeInterval;

#[derive(Debug, Clone, Serialize)]
pub struct FreeIntervalResponse {
    pub start: String,
    pub end: String,
    pub size: u64,
    pub largest_aligned_block: String,
}

impl From<FreeInterval> for FreeIntervalResponse {
    fn from(g: FreeInterval) -> Self {
        Self {
            start: Ipv4Addr::from(g.start).to_string(),
            end: Ipv4Addr::from(g.end).to_string(),
            size: g.size,
            largest_aligned_block: g.largest_aligned_block.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FragmentationResponse {
    pub score: f64,
    pub gaps: Vec<FreeIntervalResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolIdRequest {
    pub pool_id: i64,
}

/// The closed rule set `POST /analysis/compliance` accepts, mirroring
/// `cloudpam_engine::recommendations::ComplianceRule`'s variants as a
/// tagged wire form.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ComplianceRuleRequest {
    NamingConvention { pattern: String },
    TagRequired { key: String },
    MaxUtilization { pct: u8 },
    LeafPrefixBounds { min: u8, max: u8 },
    ParentMustHaveType { child_type: cloudpam_core::model::PoolType, required_parent_type: cloudpam_core::model::PoolType },
}

impl From<ComplianceRuleRequest> for cloudpam_engine::recommendations::ComplianceRule {
    fn from(r: ComplianceRuleRequest) -> Self {
        use cloudpam_engine::recommendations::ComplianceRule as Rule;
        match r {
            ComplianceRuleRequest::NamingConvention { pattern } => Rule::NamingConvention { pattern },
            ComplianceRuleRequest::TagRequired { key } => Rule::TagRequired { key },
            ComplianceRuleRequest::MaxUtilization { pct } => Rule::MaxUtilization { pct },
            ComplianceRuleRequest::LeafPrefixBounds { min, max } => Rule::LeafPrefixBounds { min, max },
            ComplianceRuleRequest::ParentMustHaveType { child_type, required_parent_type } => {
                Rule::ParentMustHaveType { child_type, required_parent_type }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceCheckRequest {
    pub pool_id: i64,
    pub rules: Vec<ComplianceRuleWithPriority>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceRuleWithPriority {
    #[serde(flatten)]
    pub rule: ComplianceRuleRequest,
    #[serde(default = "default_priority")]
    pub priority: cloudpam_core::model::RecommendationPriority,
}

fn default_priority() -> cloudpam_core::model::RecommendationPriority {
    cloudpam_core::model::RecommendationPriority::Medium
}
