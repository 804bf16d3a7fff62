use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use cloudpam_core::model::{Action, Provider, Resource, DEFAULT_ORG_ID};
use cloudpam_store::{AccountFilter, Page, PageRequest};

use crate::dto::account::{AccountResponse, CreateAccountRequest, DeleteAccountQuery, UpdateAccountRequest};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListAccountsQuery {
    pub provider: Option<Provider>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list_accounts(State(state): State<AppState>, ctx: SecurityContext, Query(q): Query<ListAccountsQuery>) -> ApiResult<Json<Page<AccountResponse>>> {
    ctx.require(Resource::Accounts, Action::List)?;
    let filter = AccountFilter { provider: q.provider, include_deleted: false };
    let page = PageRequest { page: q.page.unwrap_or(1).max(1), page_size: q.page_size.unwrap_or(50).clamp(1, 500) };
    let result = state.store.list_accounts(DEFAULT_ORG_ID, &filter, page).await?;
    Ok(Json(Page {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

async fn create_account(State(state): State<AppState>, ctx: SecurityContext, Json(body): Json<CreateAccountRequest>) -> ApiResult<Json<AccountResponse>> {
    ctx.require(Resource::Accounts, Action::Create)?;
    let account = state.store.create_account(body.into_new_account(DEFAULT_ORG_ID)).await?;
    Ok(Json(account.into()))
}

async fn get_account(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<i64>) -> ApiResult<Json<AccountResponse>> {
    ctx.require(Resource::Accounts, Action::Read)?;
    let account = state.store.get_account(DEFAULT_ORG_ID, id).await?;
    Ok(Json(account.into()))
}

async fn update_account(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAccountRequest>,
) -> ApiResult<Json<AccountResponse>> {
    ctx.require(Resource::Accounts, Action::Update)?;
    let account = state.store.update_account(DEFAULT_ORG_ID, id, body.into()).await?;
    Ok(Json(account.into()))
}

async fn delete_account(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<i64>,
    Query(q): Query<DeleteAccountQuery>,
) -> ApiResult<axum::http::StatusCode> {
    ctx.require(Resource::Accounts, Action::Delete)?;
    state.store.delete_account(DEFAULT_ORG_ID, id, q.force).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{id}", get(get_account).patch(update_account).delete(delete_account))
}
