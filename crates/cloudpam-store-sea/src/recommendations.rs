use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use cloudpam_core::model::{NewRecommendation, Recommendation, RecommendationStatus};
use cloudpam_store::{Page, PageRequest, RecommendationFilter, StoreError, StoreResult};

use crate::conv;
use crate::entities::recommendation::{self, Entity as RecommendationEntity};

pub(crate) async fn list_recommendations(db: &DatabaseConnection, org_id: Uuid, filter: &RecommendationFilter, page: PageRequest) -> StoreResult<Page<Recommendation>> {
    let rows = RecommendationEntity::find()
        .filter(recommendation::Column::OrgId.eq(org_id))
        .order_by(recommendation::Column::CreatedAt, Order::Desc)
        .all(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let mut matched: Vec<Recommendation> = rows.into_iter().map(conv::recommendation_from_model).collect::<StoreResult<Vec<_>>>()?;
    matched.retain(|r| filter.status.is_none_or(|s| r.status == s));
    matched.retain(|r| filter.recommendation_type.is_none_or(|t| r.recommendation_type == t));
    matched.retain(|r| filter.pool_id.is_none_or(|pid| r.pool_id == Some(pid)));

    let total = matched.len() as u64;
    let items = matched.into_iter().skip(page.offset() as usize).take(page.page_size as usize).collect();
    Ok(Page::new(items, total, page.page, page.page_size))
}

pub(crate) async fn create_recommendations(db: &DatabaseConnection, recs: Vec<NewRecommendation>) -> StoreResult<Vec<Recommendation>> {
    let now = Utc::now();
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
        let active = recommendation::ActiveModel {
            id: Set(rec.id),
            org_id: Set(rec.org_id),
            pool_id: Set(rec.pool_id),
            recommendation_type: Set(conv::recommendation_type_to_str(rec.recommendation_type).to_owned()),
            status: Set(conv::recommendation_status_to_str(rec.status).to_owned()),
            priority: Set(conv::recommendation_priority_to_str(rec.priority).to_owned()),
            title: Set(rec.title.clone()),
            description: Set(rec.description.clone()),
            suggested_cidr: Set(rec.suggested_cidr.clone()),
            rule_id: Set(rec.rule_id.clone()),
            score: Set(rec.score),
            metadata: Set(serde_json::to_value(&rec.metadata).unwrap_or_default()),
            applied_pool_id: Set(rec.applied_pool_id),
            created_at: Set(rec.created_at),
            updated_at: Set(rec.updated_at),
            resolved_at: Set(rec.resolved_at),
        };
        active.insert(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
        created.push(rec);
    }
    Ok(created)
}

pub(crate) async fn get_recommendation(db: &DatabaseConnection, org_id: Uuid, id: Uuid) -> StoreResult<Recommendation> {
    let row = RecommendationEntity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .filter(|r| r.org_id == org_id)
        .ok_or(StoreError::NotFound)?;
    conv::recommendation_from_model(row)
}

pub(crate) async fn apply_recommendation(db: &DatabaseConnection, org_id: Uuid, id: Uuid, created_pool_id: i64) -> StoreResult<Recommendation> {
    let rec = get_recommendation(db, org_id, id).await?;
    if !rec.is_actionable() {
        return Err(StoreError::Conflict("recommendation is not pending".into()));
    }
    let now = Utc::now();
    let active = recommendation::ActiveModel {
        id: Set(id),
        status: Set(conv::recommendation_status_to_str(RecommendationStatus::Applied).to_owned()),
        applied_pool_id: Set(Some(created_pool_id)),
        resolved_at: Set(Some(now)),
        updated_at: Set(now),
        ..Default::default()
    };
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::recommendation_from_model(row)
}

pub(crate) async fn dismiss_recommendation(db: &DatabaseConnection, org_id: Uuid, id: Uuid, reason: Option<String>) -> StoreResult<Recommendation> {
    let rec = get_recommendation(db, org_id, id).await?;
    if !rec.is_actionable() {
        return Err(StoreError::Conflict("recommendation is not pending".into()));
    }
    let mut metadata = rec.metadata.clone();
    if let Some(reason) = reason {
        metadata.insert("dismiss_reason".into(), reason);
    }
    let now = Utc::now();
    let active = recommendation::ActiveModel {
        id: Set(id),
        status: Set(conv::recommendation_status_to_str(RecommendationStatus::Dismissed).to_owned()),
        metadata: Set(serde_json::to_value(&metadata).unwrap_or_default()),
        resolved_at: Set(Some(now)),
        updated_at: Set(now),
        ..Default::default()
    };
    let row = active.update(db).await.map_err(|e| StoreError::Internal(e.to_string()))?;
    conv::recommendation_from_model(row)
}
