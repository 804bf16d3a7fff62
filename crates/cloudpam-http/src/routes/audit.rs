use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use cloudpam_core::model::{Action, Resource, DEFAULT_ORG_ID};
use cloudpam_store::{AuditFilter, Page, PageRequest};

use crate::dto::audit::{AuditEventResponse, AuditListQuery};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

async fn list(State(state): State<AppState>, ctx: SecurityContext, Query(q): Query<AuditListQuery>) -> ApiResult<Json<Page<AuditEventResponse>>> {
    ctx.require(Resource::Audit, Action::List)?;
    let filter = AuditFilter { action: q.action, resource_type: q.resource_type, actor_id: None, from: None, to: None };
    let page_size = q.limit.unwrap_or(50).clamp(1, 500);
    let page = (q.offset.unwrap_or(0) / page_size.max(1)) + 1;
    let result = state.store.list_audit(DEFAULT_ORG_ID, &filter, PageRequest { page, page_size }).await?;
    Ok(Json(Page {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/audit", get(list))
}
