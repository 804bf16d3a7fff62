use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use cloudpam_core::model::{Action, Resource, DEFAULT_ORG_ID};

use crate::dto::analysis::{ComplianceCheckRequest, FragmentationResponse};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

async fn gaps(State(state): State<AppState>, ctx: SecurityContext, Path(pool_id): Path<i64>) -> ApiResult<Json<FragmentationResponse>> {
    ctx.require(Resource::Analysis, Action::Read)?;
    let gaps = state.analysis.gap_analysis(DEFAULT_ORG_ID, pool_id).await?;
    let score = cloudpam_engine::analysis::fragmentation_score(&gaps);
    Ok(Json(FragmentationResponse { score, gaps: gaps.into_iter().map(Into::into).collect() }))
}

async fn compliance(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Json(body): Json<ComplianceCheckRequest>,
) -> ApiResult<Json<Vec<crate::dto::recommendation::RecommendationResponse>>> {
    ctx.require(Resource::Analysis, Action::Read)?;
    let rules: Vec<cloudpam_engine::recommendations::ComplianceRuleSpec> = body
        .rules
        .into_iter()
        .map(|r| cloudpam_engine::recommendations::ComplianceRuleSpec { rule: r.rule.into(), priority: r.priority })
        .collect();
    let recs = state.recommendations.evaluate_compliance(DEFAULT_ORG_ID, body.pool_id, &rules).await?;
    Ok(Json(recs.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analysis/{pool_id}/gaps", get(gaps))
        .route("/analysis/compliance", axum::routing::post(compliance))
}
