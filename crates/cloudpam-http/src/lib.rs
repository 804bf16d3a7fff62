//! The CloudPAM HTTP edge: the `/api/v1` route tree, request/response
//! DTOs, the RFC-9457 error mapping, and the authn/metrics middleware
//! every request passes through.

pub mod error_sink;
pub mod middleware;
pub mod problem;
pub mod security;
pub mod state;

mod dto;
mod request_id;
mod routes;

use std::time::Duration;

use axum::http::{HeaderName, Request};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assembles the full application router: the versioned API, the
/// unversioned health/metrics endpoints, and the shared middleware stack
/// (outermost first): request id, structured request logging, a blanket
/// per-request timeout, metrics, then authn. RBAC is not a layer here —
/// see `middleware`'s module doc.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let app = Router::new()
        .merge(routes::infra())
        .nest("/api/v1", routes::api_v1())
        .with_state(state.clone());

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(header_name.clone(), request_id::MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(header_name))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(60)))
            .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::metrics))
            .layer(axum::middleware::from_fn_with_state(state, middleware::authn)),
    )
}

/// Re-exported so binaries can build a request with a pre-set request id
/// in tests without reaching into `tower_http` directly.
pub type HttpRequest = Request<axum::body::Body>;
