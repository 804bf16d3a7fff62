use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use cloudpam_core::error::{Error as CoreError, Kind};
use cloudpam_core::model::{Action, AgentHealth, ApprovalStatus, Resource, DEFAULT_ORG_ID};
use cloudpam_store::{AgentFilter, DiscoveredResourceFilter, Page, PageRequest};

use crate::dto::discovery::{
    AgentResponse, CreateBootstrapTokenRequest, CreatedBootstrapTokenResponse, DiscoveredResourceResponse, HeartbeatRequest,
    IngestRequest, RegisterAgentRequest, RegisterAgentResponse, SyncJobResponse,
};
use crate::problem::ApiResult;
use crate::security::SecurityContext;
use crate::state::AppState;

async fn register(State(state): State<AppState>, Json(body): Json<RegisterAgentRequest>) -> ApiResult<Json<RegisterAgentResponse>> {
    // Public endpoint: the agent authenticates with the bootstrap token
    // itself, not a user session or API key.
    let ctx = cloudpam_engine::ActorContext::system();
    let outcome = state
        .discovery
        .register(&ctx, DEFAULT_ORG_ID, body.name, body.account_id, &body.token, body.version, body.hostname)
        .await?;
    Ok(Json(RegisterAgentResponse { agent_id: outcome.agent_id, api_key: outcome.api_key, approval_status: outcome.approval_status }))
}

async fn heartbeat(State(state): State<AppState>, Json(body): Json<HeartbeatRequest>) -> ApiResult<Json<AgentResponse>> {
    let agent = state.discovery.heartbeat(DEFAULT_ORG_ID, body.agent_id, body.name, body.account_id, body.version, body.hostname).await?;
    Ok(Json(AgentResponse::from_agent(agent, Utc::now())))
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListAgentsQuery {
    pub account_id: Option<i64>,
    pub health: Option<AgentHealth>,
}

async fn list_agents(State(state): State<AppState>, ctx: SecurityContext, Query(q): Query<ListAgentsQuery>) -> ApiResult<Json<Vec<AgentResponse>>> {
    ctx.require(Resource::Discovery, Action::List)?;
    let filter = AgentFilter { account_id: q.account_id, health: q.health };
    let agents = state.discovery.list_agents(DEFAULT_ORG_ID, &filter).await?;
    let now = Utc::now();
    Ok(Json(agents.into_iter().map(|a| AgentResponse::from_agent(a, now)).collect()))
}

async fn approve_agent(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<Uuid>) -> ApiResult<Json<AgentResponse>> {
    ctx.require(Resource::Discovery, Action::Update)?;
    let approved_by = ctx.user_id().ok_or_else(|| CoreError::new(Kind::Forbidden, "only a user session may approve agents"))?;
    let agent = state.discovery.approve_agent(&ctx.actor_context(), DEFAULT_ORG_ID, id, approved_by).await?;
    Ok(Json(AgentResponse::from_agent(agent, Utc::now())))
}

async fn reject_agent(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<Uuid>) -> ApiResult<Json<AgentResponse>> {
    ctx.require(Resource::Discovery, Action::Update)?;
    let agent = state.discovery.reject_agent(&ctx.actor_context(), DEFAULT_ORG_ID, id).await?;
    Ok(Json(AgentResponse::from_agent(agent, Utc::now())))
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListResourcesQuery {
    pub account_id: Option<i64>,
    pub provider: Option<cloudpam_core::model::Provider>,
    #[serde(rename = "type")]
    pub resource_type: Option<cloudpam_core::model::ResourceType>,
    pub linked_pool_id: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list_resources(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Query(q): Query<ListResourcesQuery>,
) -> ApiResult<Json<Page<DiscoveredResourceResponse>>> {
    ctx.require(Resource::Discovery, Action::List)?;
    let filter = DiscoveredResourceFilter {
        account_id: q.account_id,
        provider: q.provider,
        resource_type: q.resource_type,
        linked_pool_id: q.linked_pool_id.map(Some),
    };
    let page = PageRequest { page: q.page.unwrap_or(1).max(1), page_size: q.page_size.unwrap_or(50).clamp(1, 500) };
    let result = state.discovery.list_discovered_resources(DEFAULT_ORG_ID, &filter, page).await?;
    Ok(Json(Page {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page: result.page,
        page_size: result.page_size,
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkResourceRequest {
    pub pool_id: Option<i64>,
}

async fn link_resource(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<Uuid>,
    Json(body): Json<LinkResourceRequest>,
) -> ApiResult<Json<DiscoveredResourceResponse>> {
    ctx.require(Resource::Discovery, Action::Update)?;
    let resource = state.discovery.link_resource(DEFAULT_ORG_ID, id, body.pool_id).await?;
    Ok(Json(resource.into()))
}

async fn ingest(State(state): State<AppState>, ctx: SecurityContext, Json(body): Json<IngestRequest>) -> ApiResult<Json<SyncJobResponse>> {
    ctx.require(Resource::Discovery, Action::Create)?;
    let resources = body.resources.into_iter().map(Into::into).collect();
    let job = state.discovery.ingest(&ctx.actor_context(), DEFAULT_ORG_ID, body.account_id, body.agent_id, resources).await?;
    Ok(Json(job.into()))
}

async fn list_bootstrap_tokens(State(state): State<AppState>, ctx: SecurityContext) -> ApiResult<Json<Vec<crate::dto::discovery::BootstrapTokenResponse>>> {
    ctx.require(Resource::Discovery, Action::List)?;
    let tokens = state.store.list_bootstrap_tokens(DEFAULT_ORG_ID).await?;
    Ok(Json(tokens.into_iter().map(Into::into).collect()))
}

async fn create_bootstrap_token(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Json(body): Json<CreateBootstrapTokenRequest>,
) -> ApiResult<Json<CreatedBootstrapTokenResponse>> {
    ctx.require(Resource::Discovery, Action::Create)?;
    let (raw_token, token_hash) = new_bootstrap_token();
    let token = cloudpam_core::model::BootstrapToken {
        id: Uuid::new_v4(),
        name: body.name,
        token_hash,
        account_id: body.account_id,
        created_by: ctx.user_id(),
        expires_at: body.expires_at,
        revoked: false,
        used_count: 0,
        max_uses: body.max_uses,
        created_at: Utc::now(),
    };
    let created = state.store.create_bootstrap_token(token).await?;
    Ok(Json(CreatedBootstrapTokenResponse { token: created.into(), raw_token }))
}

fn new_bootstrap_token() -> (String, String) {
    use rand::Rng;
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let raw: String = (0..40).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect();
    let raw = format!("cpamtok_{raw}");
    let hash = cloudpam_auth::api_key::hash_secret(&raw);
    (raw, hash)
}

async fn revoke_bootstrap_token(
    State(state): State<AppState>,
    ctx: SecurityContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<crate::dto::discovery::BootstrapTokenResponse>> {
    ctx.require(Resource::Discovery, Action::Delete)?;
    let tokens = state.store.list_bootstrap_tokens(DEFAULT_ORG_ID).await?;
    let mut token = tokens
        .into_iter()
        .find(|t| t.id == id)
        .ok_or_else(|| CoreError::new(Kind::NotFound, "bootstrap token not found"))?;
    token.revoked = true;
    let token = state.store.update_bootstrap_token(DEFAULT_ORG_ID, token).await?;
    Ok(Json(token.into()))
}

async fn get_agent(State(state): State<AppState>, ctx: SecurityContext, Path(id): Path<Uuid>) -> ApiResult<Json<AgentResponse>> {
    ctx.require(Resource::Discovery, Action::Read)?;
    let agent = state.store.get_agent(DEFAULT_ORG_ID, id).await?;
    Ok(Json(AgentResponse::from_agent(agent, Utc::now())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/discovery/register", post(register))
        .route("/discovery/heartbeat", post(heartbeat))
        .route("/discovery/agents", get(list_agents))
        .route("/discovery/agents/{id}", get(get_agent))
        .route("/discovery/agents/{id}/approve", post(approve_agent))
        .route("/discovery/agents/{id}/reject", post(reject_agent))
        .route("/discovery/resources", get(list_resources))
        .route("/discovery/resources/{id}/link", post(link_resource))
        .route("/discovery/ingest", post(ingest))
        .route("/discovery/tokens", get(list_bootstrap_tokens).post(create_bootstrap_token))
        .route("/discovery/tokens/{id}/revoke", post(revoke_bootstrap_token))
}
