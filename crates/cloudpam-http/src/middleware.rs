//! The two request-scoped concerns every route shares: resolving who's
//! calling (authn) and recording per-request metrics. RBAC itself isn't a
//! middleware here — each handler declares the one permission it needs
//! and checks it via [`SecurityContext::require`], since (unlike the
//! teacher's multi-module route-policy resolver) there's a single router
//! and the required permission differs per handler, not per path prefix.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use crate::security::{Principal, SecurityContext};
use crate::state::AppState;

fn client_ip(state: &AppState, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let peer_ip = peer.map(|addr| addr.ip())?;
    let forwarded_for = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    Some(state.trusted_proxies.resolve_client_ip(peer_ip, forwarded_for))
}

/// Resolves a session cookie or bearer API key into a [`SecurityContext`]
/// and inserts it into request extensions. A session, if present, always
/// wins over a bearer key, per the contract in `cloudpam_core`'s auth
/// model. Authentication is never *required* here — routes that need a
/// principal call [`SecurityContext::require`] themselves, so public
/// endpoints (health checks, login) pass straight through.
pub async fn authn(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    let ip = client_ip(&state, &headers, Some(peer));
    let user_agent = headers.get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let request_id = request
        .extensions()
        .get::<tower_http::request_id::RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let principal = resolve_principal(&state, &jar, &headers).await;

    let ctx = SecurityContext { principal, ip, user_agent, request_id };
    request.extensions_mut().insert(ctx);

    next.run(request).await
}

async fn resolve_principal(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Principal {
    if let Some(cookie) = jar.get(&state.cookies.name) {
        if let Some(session) = state.sessions.resolve(cookie.value()).await {
            if let Ok(user) = state.store.get_user(cloudpam_core::model::DEFAULT_ORG_ID, session.user_id).await {
                return Principal::User(user);
            }
        }
    }

    if let Some(bearer) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        if let Ok(key) = state.api_keys.authenticate(bearer).await {
            return Principal::ApiKey(key);
        }
    }

    Principal::Anonymous
}

/// Records request-duration and status-code metrics for every response,
/// and reports 5xx responses to the error sink. Labels on the literal
/// request path, which is a known, bounded cardinality risk for
/// id-bearing routes (`/pools/{id}`) accepted here for simplicity — see
/// `DESIGN.md`.
pub async fn metrics(State(state): State<AppState>, request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();

    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed().as_secs_f64();
    let status = response.status();
    state.metrics.http.record_request(&method, &path, status.as_u16(), elapsed);
    if status.is_server_error() {
        state.error_sink.capture(status.as_u16(), &method, &path).await;
    }
    response
}
