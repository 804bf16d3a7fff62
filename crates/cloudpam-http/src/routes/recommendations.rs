use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use cloudpam_core::model::{Action, Resource, DEFAULT_ORG_ID};
use cloudpam_store::{Page, PageRequest, RecommendationFilter};

use crate::dto::recommendation::{DismissRecommendationRequest, GenerateAllocationRequest, RecommendationListQuery, RecommendationResponse};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

async fn list(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Query(q): Query<RecommendationListQuery>,
) -> ApiResult<Json<Page<RecommendationResponse>>> {
    ctx.require(Resource::Recommendations, Action::List)?;
    let filter = RecommendationFilter { status: q.status, recommendation_type: q.recommendation_type, pool_id: q.pool_id };
    let page = PageRequest { page: q.page.unwrap_or(1).max(1), page_size: q.page_size.unwrap_or(50).clamp(1, 500) };
    let result = state.recommendations.list(DEFAULT_ORG_ID, &filter, page).await?;
    Ok(Json(Page {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

async fn generate_allocation(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Json(body): Json<GenerateAllocationRequest>,
) -> ApiResult<Json<Option<RecommendationResponse>>> {
    ctx.require(Resource::Recommendations, Action::Create)?;
    let rec = state.recommendations.recommend_allocation(DEFAULT_ORG_ID, body.pool_id, body.prefix_len).await?;
    Ok(Json(rec.map(Into::into)))
}

async fn apply(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<Uuid>) -> ApiResult<Json<RecommendationResponse>> {
    ctx.require(Resource::Recommendations, Action::Update)?;
    let rec = state.recommendations.apply(&ctx.actor_context(), DEFAULT_ORG_ID, id).await?;
    Ok(Json(rec.into()))
}

async fn dismiss(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<Uuid>,
    Json(body): Json<DismissRecommendationRequest>,
) -> ApiResult<Json<RecommendationResponse>> {
    ctx.require(Resource::Recommendations, Action::Update)?;
    let rec = state.recommendations.dismiss(&ctx.actor_context(), DEFAULT_ORG_ID, id, body.reason).await?;
    Ok(Json(rec.into()))
}

async fn get_one(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<Uuid>) -> ApiResult<Json<RecommendationResponse>> {
    ctx.require(Resource::Recommendations, Action::Read)?;
    let rec = state.store.get_recommendation(DEFAULT_ORG_ID, id).await?;
    Ok(Json(rec.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recommendations", get(list))
        .route("/recommendations/{id}", get(get_one))
        .route("/recommendations/allocations", post(generate_allocation))
        .route("/recommendations/{id}/apply", post(apply))
        .route("/recommendations/{id}/dismiss", post(dismiss))
}
