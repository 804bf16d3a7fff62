use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use cloudpam_core::model::{Action, Resource, DEFAULT_ORG_ID};
use cloudpam_store::{Page, PageRequest};

use crate::dto::search::{SearchHitResponse, SearchQueryParams};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

async fn search(State(state): State<AppState>, ctx: SecurityContext, Query(params): Query<SearchQueryParams>) -> ApiResult<Json<Page<SearchHitResponse>>> {
    ctx.require(Resource::Pools, Action::Read)?;
    let page = PageRequest { page: params.page.unwrap_or(1).max(1), page_size: params.page_size.unwrap_or(50).clamp(1, 500) };
    let query = params.into_query()?;
    let result = state.search.search(DEFAULT_ORG_ID, &query, page).await?;
    Ok(Json(Page {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}
