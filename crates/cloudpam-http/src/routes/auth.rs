use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use cloudpam_auth::{hash_password, verify_password, HashCost};
use cloudpam_core::error::{Error as CoreError, Kind};
use cloudpam_core::model::{Action, NewUser, Resource, DEFAULT_ORG_ID};
use cloudpam_store::PageRequest;

use crate::dto::auth::{
    ApiKeyResponse, CreateApiKeyRequest, CreateUserRequest, CreatedApiKeyResponse, LoginRequest, UpdateUserRequest, UserResponse,
};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

fn session_cookie(state: &AppState, value: String, max_age: Option<cookie::time::Duration>) -> Cookie<'static> {
    let mut builder = Cookie::build((state.cookies.name.clone(), value))
        .http_only(true)
        .secure(state.cookies.secure)
        .same_site(SameSite::Lax)
        .path("/");
    if let Some(age) = max_age {
        builder = builder.max_age(age);
    }
    builder.build()
}

async fn login(State(state): State<AppState>, ctx: SecurityContext, jar: CookieJar, Json(body): Json<LoginRequest>) -> ApiResult<(CookieJar, Json<UserResponse>)> {
    let ip = ctx.ip;
    if let Some(ip) = ip {
        if !state.login_limiter.record_failure(ip) {
            return Err(CoreError::new(Kind::RateLimited, "too many login attempts, try again later").into());
        }
    }

    let user = state
        .store
        .get_user_by_username(DEFAULT_ORG_ID, &body.username)
        .await
        .map_err(|_| CoreError::new(Kind::Unauthenticated, "invalid username or password"))?;

    if !user.active || !verify_password(&body.password, &user.password_hash) {
        return Err(CoreError::new(Kind::Unauthenticated, "invalid username or password").into());
    }

    let session = state.sessions.create(user.id, ip, ctx.user_agent.clone()).await?;
    let max_age = (session.expires_at - session.created_at).to_std().ok().and_then(|d| cookie::time::Duration::try_from(d).ok());
    let jar = jar.add(session_cookie(&state, session.id, max_age));
    Ok((jar, Json(user.into())))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> ApiResult<(CookieJar, axum::http::StatusCode)> {
    if let Some(cookie) = jar.get(&state.cookies.name) {
        state.sessions.revoke(cookie.value()).await.ok();
    }
    let jar = jar.remove(Cookie::build(state.cookies.name.clone()).path("/").build());
    Ok((jar, axum::http::StatusCode::NO_CONTENT))
}

async fn me(ctx: SecurityContext) -> ApiResult<Json<Option<UserResponse>>> {
    match ctx.principal {
        crate::security::Principal::User(user) => Ok(Json(Some(user.into()))),
        _ => Ok(Json(None)),
    }
}

async fn list_users(State(state): State<AppState>, ctx: SecurityContext) -> ApiResult<Json<Vec<UserResponse>>> {
    ctx.require(Resource::Users, Action::List)?;
    let page = state.store.list_users(DEFAULT_ORG_ID, PageRequest { page: 1, page_size: 500 }).await?;
    Ok(Json(page.items.into_iter().map(Into::into).collect()))
}

async fn create_user(State(state): State<AppState>, ctx: SecurityContext, Json(body): Json<CreateUserRequest>) -> ApiResult<Json<UserResponse>> {
    ctx.require(Resource::Users, Action::Create)?;
    let password_hash = hash_password(&body.password, HashCost::default()).map_err(|e| CoreError::new(Kind::Validation, e.to_string()))?;
    let new_user = NewUser {
        org_id: DEFAULT_ORG_ID,
        username: body.username,
        email: body.email,
        display_name: body.display_name,
        role: body.role,
        password_hash,
    };
    let user = state.store.create_user(new_user).await?;
    Ok(Json(user.into()))
}

async fn update_user(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    ctx.require(Resource::Users, Action::Update)?;
    let mut user = state.store.get_user(DEFAULT_ORG_ID, id).await?;
    if let Some(email) = body.email {
        user.email = email;
    }
    if let Some(display_name) = body.display_name {
        user.display_name = display_name;
    }
    if let Some(role) = body.role {
        user.role = role;
    }
    if let Some(active) = body.active {
        user.active = active;
    }
    if let Some(password) = body.password {
        user.password_hash = hash_password(&password, HashCost::default()).map_err(|e| CoreError::new(Kind::Validation, e.to_string()))?;
    }
    user.updated_at = chrono::Utc::now();
    let user = state.store.update_user(DEFAULT_ORG_ID, user).await?;
    Ok(Json(user.into()))
}

async fn delete_user(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<Uuid>) -> ApiResult<axum::http::StatusCode> {
    ctx.require(Resource::Users, Action::Delete)?;
    state.store.delete_user(DEFAULT_ORG_ID, id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn list_api_keys(State(state): State<AppState>, ctx: SecurityContext) -> ApiResult<Json<Vec<ApiKeyResponse>>> {
    ctx.require(Resource::ApiKeys, Action::List)?;
    let keys = state.api_keys.list(DEFAULT_ORG_ID, ctx.user_id()).await?;
    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

async fn create_api_key(State(state): State<AppState>, ctx: SecurityContext, Json(body): Json<CreateApiKeyRequest>) -> ApiResult<Json<CreatedApiKeyResponse>> {
    ctx.require(Resource::ApiKeys, Action::Create)?;
    let minted = state.api_keys.mint(DEFAULT_ORG_ID, body.name, body.scopes, ctx.user_id(), body.expires_at).await?;
    Ok(Json(CreatedApiKeyResponse { key: minted.record.into(), raw_key: minted.full_key }))
}

async fn revoke_api_key(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<Uuid>) -> ApiResult<axum::http::StatusCode> {
    ctx.require(Resource::ApiKeys, Action::Delete)?;
    state.api_keys.revoke(DEFAULT_ORG_ID, id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", axum::routing::patch(update_user).delete(delete_user))
        .route("/api-keys", get(list_api_keys).post(create_api_key))
        .route("/api-keys/{id}", axum::routing::delete(revoke_api_key))
}
