use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use cloudpam_core::model::{Action, Resource, DEFAULT_ORG_ID};
use cloudpam_store::{Page, PageRequest, PoolFilter};

use crate::dto::pool::{
    BlockResponse, BlocksQuery, BlocksResponse, CreatePoolRequest, PoolNodeResponse, PoolResponse, PoolStatsResponse, UpdatePoolRequest,
};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListPoolsQuery {
    pub parent_id: Option<i64>,
    pub roots_only: Option<bool>,
    pub account_id: Option<i64>,
    pub pool_type: Option<cloudpam_core::model::PoolType>,
    pub status: Option<cloudpam_core::model::PoolStatus>,
    pub source: Option<cloudpam_core::model::PoolSource>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list_pools(State(state): State<AppState>, ctx: SecurityContext, Query(q): Query<ListPoolsQuery>) -> ApiResult<Json<Page<PoolResponse>>> {
    ctx.require(Resource::Pools, Action::List)?;
    let parent_id = if q.roots_only.unwrap_or(false) { Some(None) } else { q.parent_id.map(Some) };
    let filter = PoolFilter {
        parent_id,
        account_id: q.account_id,
        pool_type: q.pool_type,
        status: q.status,
        source: q.source,
        include_deleted: false,
    };
    let page = PageRequest { page: q.page.unwrap_or(1).max(1), page_size: q.page_size.unwrap_or(50).clamp(1, 500) };
    let result = state.hierarchy.list_pools(DEFAULT_ORG_ID, &filter, page).await?;
    Ok(Json(Page {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

async fn create_pool(State(state): State<AppState>, ctx: SecurityContext, Json(body): Json<CreatePoolRequest>) -> ApiResult<Json<PoolResponse>> {
    ctx.require(Resource::Pools, Action::Create)?;
    let new_pool = body.into_new_pool(DEFAULT_ORG_ID)?;
    let pool = state.hierarchy.create_pool(&ctx.actor_context(), new_pool).await?;
    Ok(Json(pool.into()))
}

async fn get_pool(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<i64>) -> ApiResult<Json<PoolResponse>> {
    ctx.require(Resource::Pools, Action::Read)?;
    let pool = state.hierarchy.get_pool(DEFAULT_ORG_ID, id).await?;
    Ok(Json(pool.into()))
}

async fn update_pool(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePoolRequest>,
) -> ApiResult<Json<PoolResponse>> {
    ctx.require(Resource::Pools, Action::Update)?;
    let pool = state.hierarchy.update_pool(&ctx.actor_context(), DEFAULT_ORG_ID, id, body.into()).await?;
    Ok(Json(pool.into()))
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeletePoolQuery {
    #[serde(default)]
    pub force: bool,
}

async fn delete_pool(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<i64>,
    Query(q): Query<DeletePoolQuery>,
) -> ApiResult<axum::http::StatusCode> {
    ctx.require(Resource::Pools, Action::Delete)?;
    let actor = ctx.actor_context();
    if q.force {
        state.hierarchy.cascade_delete_pool(&actor, DEFAULT_ORG_ID, id).await?;
    } else {
        state.hierarchy.delete_pool(&actor, DEFAULT_ORG_ID, id).await?;
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HierarchyQuery {
    pub root: Option<i64>,
}

async fn hierarchy(State(state): State<AppState>, ctx: SecurityContext, Query(q): Query<HierarchyQuery>) -> ApiResult<Json<Vec<PoolNodeResponse>>> {
    ctx.require(Resource::Pools, Action::List)?;
    let nodes = state.hierarchy.hierarchy(DEFAULT_ORG_ID, q.root).await?;
    Ok(Json(nodes.into_iter().map(Into::into).collect()))
}

async fn stats(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<i64>) -> ApiResult<Json<PoolStatsResponse>> {
    ctx.require(Resource::Pools, Action::Read)?;
    let (_, stats) = state.hierarchy.get_pool_with_stats(DEFAULT_ORG_ID, id).await?;
    Ok(Json(stats.into()))
}

async fn blocks(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<i64>, Query(q): Query<BlocksQuery>) -> ApiResult<Json<BlocksResponse>> {
    ctx.require(Resource::Pools, Action::Read)?;
    let page = q.page.unwrap_or(1).max(1);
    let page_size = q.page_size.unwrap_or(50).clamp(1, 500);
    let (items, total): (Vec<BlockResponse>, u64) = {
        let (blocks, total) = state.hierarchy.enumerate_blocks(DEFAULT_ORG_ID, id, q.new_prefix_len, page, page_size).await?;
        (blocks.into_iter().map(Into::into).collect(), total)
    };
    Ok(Json(BlocksResponse { items, total, page, page_size }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pools", get(list_pools).post(create_pool))
        .route("/pools/hierarchy", get(hierarchy))
        .route("/pools/{id}", get(get_pool).patch(update_pool).delete(delete_pool))
        .route("/pools/{id}/stats", get(stats))
        .route("/pools/{id}/blocks", get(blocks))
}
