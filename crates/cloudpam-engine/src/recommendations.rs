//! Compliance rule evaluation, allocation proposals, and the
//! apply/dismiss lifecycle atop [`cloudpam_store::Store`]'s recommendation
//! rows.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use uuid::Uuid;

use cloudpam_core::model::{
    AuditAction, NewPool, NewRecommendation, Pool, PoolSource, PoolStats, PoolStatus, PoolType, Recommendation,
    RecommendationPriority, RecommendationStatus, RecommendationType,
};
use cloudpam_store::{PageRequest, RecommendationFilter, Store, StoreError, StoreResult};

use cloudpam_audit::AuditSink;

use crate::analysis::gap_analysis;
use crate::context::ActorContext;
use crate::hierarchy::HierarchyService;

/// A single configured compliance check. `rule_id()` renders the form
/// `naming_convention`, `tag_required:<key>`, etc. used on the resulting
/// `Recommendation.rule_id`.
#[derive(Debug, Clone)]
pub enum ComplianceRule {
    NamingConvention { pattern: String },
    TagRequired { key: String },
    MaxUtilization { pct: u8 },
    LeafPrefixBounds { min: u8, max: u8 },
    ParentMustHaveType { child_type: PoolType, required_parent_type: PoolType },
}

impl ComplianceRule {
    #[must_use]
    pub fn rule_id(&self) -> String {
        match self {
            ComplianceRule::NamingConvention { .. } => "naming_convention".to_string(),
            ComplianceRule::TagRequired { key } => format!("tag_required:{key}"),
            ComplianceRule::MaxUtilization { pct } => format!("max_utilization:{pct}"),
            ComplianceRule::LeafPrefixBounds { min, max } => format!("leaf_prefix_bounds:{min}-{max}"),
            ComplianceRule::ParentMustHaveType { .. } => "parent_must_have_type".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComplianceRuleSpec {
    pub rule: ComplianceRule,
    pub priority: RecommendationPriority,
}

/// What a single rule needs to see about a pool to be evaluated.
pub struct ComplianceContext<'a> {
    pub pool: &'a Pool,
    pub parent: Option<&'a Pool>,
    pub is_leaf: bool,
    pub stats: Option<&'a PoolStats>,
}

fn evaluate_rule(spec: &ComplianceRuleSpec, ctx: &ComplianceContext<'_>) -> Option<NewRecommendation> {
    let violation = match &spec.rule {
        ComplianceRule::NamingConvention { pattern } => {
            let re = Regex::new(pattern).ok()?;
            (!re.is_match(&ctx.pool.name)).then(|| format!("pool name `{}` does not match `{pattern}`", ctx.pool.name))
        }
        ComplianceRule::TagRequired { key } => (!ctx.pool.tags.contains_key(key)).then(|| format!("pool is missing required tag `{key}`")),
        ComplianceRule::MaxUtilization { pct } => ctx.stats.and_then(|s| {
            (s.utilization_pct > f64::from(*pct)).then(|| format!("utilization {:.1}% exceeds the {pct}% threshold", s.utilization_pct))
        }),
        ComplianceRule::LeafPrefixBounds { min, max } => {
            let len = ctx.pool.cidr.prefix_len();
            (ctx.is_leaf && (len < *min || len > *max))
                .then(|| format!("leaf pool prefix length /{len} is outside the allowed /{min}-/{max} range"))
        }
        ComplianceRule::ParentMustHaveType { child_type, required_parent_type } => {
            if ctx.pool.pool_type != *child_type {
                None
            } else {
                match ctx.parent {
                    Some(parent) if parent.pool_type != *required_parent_type => {
                        Some(format!("parent pool has type {:?}, expected {required_parent_type:?}", parent.pool_type))
                    }
                    None => Some(format!("pool has no parent of the required type {required_parent_type:?}")),
                    _ => None,
                }
            }
        }
    }?;

    Some(NewRecommendation {
        org_id: ctx.pool.org_id,
        pool_id: Some(ctx.pool.id),
        recommendation_type: RecommendationType::Compliance,
        priority: spec.priority,
        title: format!("Compliance violation: {}", spec.rule.rule_id()),
        description: violation,
        suggested_cidr: None,
        rule_id: Some(spec.rule.rule_id()),
        score: 0.0,
        metadata: HashMap::new(),
    })
}

/// Score an allocation candidate: earlier free blocks score higher, and
/// among blocks at the same offset a tighter (more-specific) alignment
/// scores higher.
fn allocation_score(offset_rank: usize, total_candidates: usize, prefix_len: u8) -> f64 {
    let position_score = if total_candidates <= 1 { 100.0 } else { 100.0 * (1.0 - (offset_rank as f64 / (total_candidates - 1) as f64)) };
    position_score + f64::from(prefix_len) / 1000.0
}

pub struct RecommendationService {
    store: Arc<dyn Store>,
    audit: Arc<dyn AuditSink>,
    hierarchy: HierarchyService,
}

impl RecommendationService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        let hierarchy = HierarchyService::new(store.clone(), audit.clone());
        Self { store, audit, hierarchy }
    }

    pub async fn list(&self, org_id: Uuid, filter: &RecommendationFilter, page: PageRequest) -> StoreResult<cloudpam_store::Page<Recommendation>> {
        self.store.list_recommendations(org_id, filter, page).await
    }

    /// Evaluates every configured rule against `pool_id` and persists one
    /// `Recommendation` per violation.
    pub async fn evaluate_compliance(&self, org_id: Uuid, pool_id: i64, rules: &[ComplianceRuleSpec]) -> StoreResult<Vec<Recommendation>> {
        let pool = self.store.get_pool(org_id, pool_id).await?;
        let parent = match pool.parent_id {
            Some(pid) => Some(self.store.get_pool(org_id, pid).await?),
            None => None,
        };
        let children = self.store.list_children(org_id, pool_id).await?;
        let (_, stats) = self.store.get_pool_with_stats(org_id, pool_id).await?;
        let ctx = ComplianceContext { pool: &pool, parent: parent.as_ref(), is_leaf: children.is_empty(), stats: Some(&stats) };

        let news: Vec<NewRecommendation> = rules.iter().filter_map(|spec| evaluate_rule(spec, &ctx)).collect();
        if news.is_empty() {
            return Ok(Vec::new());
        }
        self.store.create_recommendations(news).await
    }

    /// Proposes the lowest-indexed free block of `prefix_len` under
    /// `pool_id` and persists it as a pending allocation recommendation.
    pub async fn recommend_allocation(&self, org_id: Uuid, pool_id: i64, prefix_len: u8) -> StoreResult<Option<Recommendation>> {
        let pool = self.store.get_pool(org_id, pool_id).await?;
        if prefix_len <= pool.cidr.prefix_len() || prefix_len > 32 {
            return Err(StoreError::Validation(format!("prefix length must be greater than {} and at most 32", pool.cidr.prefix_len())));
        }
        let children = self.store.list_children(org_id, pool_id).await?;
        let gaps = gap_analysis(&pool, &children);

        let mut candidates: Vec<cloudpam_cidr::Cidr> = Vec::new();
        for gap in &gaps {
            let block_size = 1u64 << (32 - prefix_len);
            let mut addr = u64::from(gap.start).div_ceil(block_size) * block_size;
            while addr + block_size - 1 <= u64::from(gap.end) {
                #[allow(clippy::cast_possible_truncation)]
                candidates.push(cloudpam_cidr::Cidr::new_unchecked(addr as u32, prefix_len));
                addr += block_size;
            }
        }

        let Some(best) = candidates.first() else {
            return Ok(None);
        };
        let score = allocation_score(0, candidates.len(), prefix_len);

        let new = NewRecommendation {
            org_id,
            pool_id: Some(pool_id),
            recommendation_type: RecommendationType::Allocation,
            priority: RecommendationPriority::Low,
            title: format!("Allocate {best} under {}", pool.name),
            description: format!("Lowest available /{prefix_len} block under {} is {best}", pool.name),
            suggested_cidr: Some(best.to_string()),
            rule_id: None,
            score,
            metadata: HashMap::new(),
        };
        let created = self.store.create_recommendations(vec![new]).await?;
        Ok(created.into_iter().next())
    }

    /// Creates the suggested pool and marks the recommendation applied.
    /// Reports `Conflict` without mutating the recommendation if the
    /// suggested CIDR is no longer free by the time this runs.
    pub async fn apply(&self, ctx: &ActorContext, org_id: Uuid, id: Uuid) -> StoreResult<Recommendation> {
        let rec = self.store.get_recommendation(org_id, id).await?;
        if rec.status != RecommendationStatus::Pending {
            return Err(StoreError::Conflict("recommendation is not pending".into()));
        }
        let cidr = rec.suggested_cidr.clone().ok_or_else(|| StoreError::Validation("recommendation has no suggested CIDR".into()))?;

        let new_pool = NewPool {
            org_id,
            name: format!("{}-{}", rec.rule_id.as_deref().unwrap_or("rec"), &rec.id.to_string()[..8]),
            cidr,
            parent_id: rec.pool_id,
            account_id: None,
            pool_type: PoolType::Subnet,
            status: PoolStatus::Active,
            source: PoolSource::Manual,
            description: Some(rec.description.clone()),
            tags: HashMap::new(),
        };

        let pool = match self.hierarchy.create_pool(ctx, new_pool).await {
            Ok(pool) => pool,
            Err(StoreError::Conflict(msg)) => return Err(StoreError::Conflict(format!("suggested CIDR is no longer free: {msg}"))),
            Err(e) => return Err(e),
        };

        match self.store.apply_recommendation(org_id, id, pool.id).await {
            Ok(updated) => {
                self.audit
                    .record(ctx.event(org_id, AuditAction::Apply, "recommendation", id.to_string(), None, serde_json::to_value(&updated).ok()))
                    .await;
                Ok(updated)
            }
            Err(e) => {
                let _ = self.hierarchy.delete_pool(ctx, org_id, pool.id).await;
                Err(e)
            }
        }
    }

    pub async fn dismiss(&self, ctx: &ActorContext, org_id: Uuid, id: Uuid, reason: Option<String>) -> StoreResult<Recommendation> {
        let updated = self.store.dismiss_recommendation(org_id, id, reason).await?;
        self.audit
            .record(ctx.event(org_id, AuditAction::Dismiss, "recommendation", id.to_string(), None, serde_json::to_value(&updated).ok()))
            .await;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_ids_render_with_parameters() {
        assert_eq!(ComplianceRule::NamingConvention { pattern: "^x".into() }.rule_id(), "naming_convention");
        assert_eq!(ComplianceRule::TagRequired { key: "owner".into() }.rule_id(), "tag_required:owner");
        assert_eq!(ComplianceRule::MaxUtilization { pct: 90 }.rule_id(), "max_utilization:90");
        assert_eq!(ComplianceRule::LeafPrefixBounds { min: 24, max: 28 }.rule_id(), "leaf_prefix_bounds:24-28");
    }

    #[test]
    fn allocation_score_prefers_earlier_and_tighter_blocks() {
        let first = allocation_score(0, 10, 28);
        let last = allocation_score(9, 10, 28);
        assert!(first > last);
    }
}
