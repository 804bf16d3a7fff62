use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Allocation,
    Compliance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Applied,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub org_id: Uuid,
    pub pool_id: Option<i64>,
    pub recommendation_type: RecommendationType,
    pub status: RecommendationStatus,
    pub priority: RecommendationPriority,
    pub title: String,
    pub description: String,
    pub suggested_cidr: Option<String>,
    /// Identifies the compliance rule that produced this, if any.
    pub rule_id: Option<String>,
    pub score: f64,
    pub metadata: HashMap<String, String>,
    pub applied_pool_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        matches!(self.status, RecommendationStatus::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub org_id: Uuid,
    pub pool_id: Option<i64>,
    pub recommendation_type: RecommendationType,
    pub priority: RecommendationPriority,
    pub title: String,
    pub description: String,
    pub suggested_cidr: Option<String>,
    pub rule_id: Option<String>,
    pub score: f64,
    pub metadata: HashMap<String, String>,
}
