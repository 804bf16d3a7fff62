use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cloudpam_core::model::{Recommendation, RecommendationPriority, RecommendationStatus, RecommendationType};

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub id: Uuid,
    pub pool_id: Option<i64>,
    pub recommendation_type: RecommendationType,
    pub status: RecommendationStatus,
    pub priority: RecommendationPriority,
    pub title: String,
    pub description: String,
    pub suggested_cidr: Option<String>,
    pub rule_id: Option<String>,
    pub score: f64,
    pub metadata: HashMap<String, String>,
    pub applied_pool_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<Recommendation> for RecommendationResponse {
    fn from(r: Recommendation) -> Self {
        Self {
            id: r.id,
            pool_id: r.pool_id,
            recommendation_type: r.recommendation_type,
            status: r.status,
            priority: r.priority,
            title: r.title,
            description: r.description,
            suggested_cidr: r.suggested_cidr,
            rule_id: r.rule_id,
            score: r.score,
            metadata: r.metadata,
            applied_pool_id: r.applied_pool_id,
            created_at: r.created_at,
            resolved_at: r.resolved_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateAllocationRequest {
    pub pool_id: i64,
    pub prefix_len: u8,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecommendationListQuery {
    pub status: Option<RecommendationStatus>,
    #[serde(rename = "type")]
    pub recommendation_type: Option<RecommendationType>,
    pub pool_id: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DismissRecommendationRequest {
    pub reason: Option<String>,
}
