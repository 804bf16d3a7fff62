use uuid::Uuid;

use cloudpam_core::model::{NewRecommendation, Recommendation, RecommendationStatus};
use cloudpam_store::{Page, PageRequest, RecommendationFilter, StoreError, StoreResult};

use crate::state::Inner;

impl Inner {
    pub(crate) fn list_recommendations(
        &self,
        org_id: Uuid,
        filter: &RecommendationFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Recommendation>> {
        let mut matched: Vec<&Recommendation> = self
            .recommendations
            .values()
            .filter(|r| r.org_id == org_id)
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.recommendation_type.is_none_or(|t| r.recommendation_type == t))
            .filter(|r| filter.pool_id.is_none_or(|pid| r.pool_id == Some(pid)))
            .collect();
        matched.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, page.page, page.page_size))
    }

    pub(crate) fn create_recommendations(&mut self, recs: Vec<NewRecommendation>) -> StoreResult<Vec<Recommendation>> {
        let now = Inner::now();
        let mut created = Vec::with_capacity(recs.len());
        for new in recs {
            let rec = Recommendation {
                id: Uuid::new_v4(),
                org_id: new.org_id,
                pool_id: new.pool_id,
                recommendation_type: new.recommendation_type,
                status: RecommendationStatus::Pending,
                priority: new.priority,
                title: new.title,
                description: new.description,
                suggested_cidr: new.suggested_cidr,
                rule_id: new.rule_id,
                score: new.score,
                metadata: new.metadata,
                applied_pool_id: None,
                created_at: now,
                updated_at: now,
                resolved_at: None,
            };
            self.recommendations.insert(rec.id, rec.clone());
            created.push(rec);
        }
        Ok(created)
    }

    pub(crate) fn get_recommendation(&self, org_id: Uuid, id: Uuid) -> StoreResult<Recommendation> {
        self.recommendations
            .get(&id)
            .filter(|r| r.org_id == org_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub(crate) fn apply_recommendation(&mut self, org_id: Uuid, id: Uuid, created_pool_id: i64) -> StoreResult<Recommendation> {
        let rec = self.get_recommendation(org_id, id)?;
        if !rec.is_actionable() {
            return Err(StoreError::Conflict("recommendation is not pending".into()));
        }
        let rec = self.recommendations.get_mut(&id).ok_or(StoreError::NotFound)?;
        rec.status = RecommendationStatus::Applied;
        rec.applied_pool_id = Some(created_pool_id);
        rec.resolved_at = Some(Inner::now());
        rec.updated_at = rec.resolved_at.unwrap();
        Ok(rec.clone())
    }

    pub(crate) fn dismiss_recommendation(&mut self, org_id: Uuid, id: Uuid, reason: Option<String>) -> StoreResult<Recommendation> {
        let rec = self.get_recommendation(org_id, id)?;
        if !rec.is_actionable() {
            return Err(StoreError::Conflict("recommendation is not pending".into()));
        }
        let rec = self.recommendations.get_mut(&id).ok_or(StoreError::NotFound)?;
        rec.status = RecommendationStatus::Dismissed;
        if let Some(reason) = reason {
            rec.metadata.insert("dismiss_reason".into(), reason);
        }
        rec.resolved_at = Some(Inner::now());
        rec.updated_at = rec.resolved_at.unwrap();
        Ok(rec.clone())
    }
}
