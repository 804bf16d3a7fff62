use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use cloudpam_core::model::{Action, Resource, DEFAULT_ORG_ID};

use crate::dto::schema::{SchemaApplyRequest, SchemaCheckRequest, SchemaPlanResponse};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

async fn check(State(state): State<AppState>, ctx: SecurityContext, Json(body): Json<SchemaCheckRequest>) -> ApiResult<Json<SchemaPlanResponse>> {
    ctx.require(Resource::Pools, Action::Create)?;
    let items = body.items.into_iter().map(Into::into).collect::<Vec<_>>();
    let result = state.schema_plan.precheck(DEFAULT_ORG_ID, &items).await?;
    Ok(Json(result.into()))
}

/// Rows that fail validation are applied or skipped according to
/// `skip_conflicts`; the response is `200` either way — a partial
/// application is not itself an error, callers inspect `rows[].error`.
async fn apply(State(state): State<AppState>, ctx: SecurityContext, Json(body): Json<SchemaApplyRequest>) -> ApiResult<Json<SchemaPlanResponse>> {
    ctx.require(Resource::Pools, Action::Create)?;
    let items = body.items.into_iter().map(Into::into).collect::<Vec<_>>();
    let result = state.schema_plan.apply(&ctx.actor_context(), DEFAULT_ORG_ID, items, body.skip_conflicts).await?;
    Ok(Json(result.into()))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/schema/check", post(check)).route("/schema/apply", post(apply))
}
