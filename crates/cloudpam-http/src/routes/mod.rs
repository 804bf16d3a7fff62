mod accounts;
mod analysis;
mod audit;
mod auth;
mod discovery;
mod health;
mod pools;
mod recommendations;
mod schema;
mod search;

use axum::Router;

use crate::state::AppState;

/// Every `/api/v1/*` route, merged into one router. Health/readiness/
/// metrics live outside the `/api/v1` prefix since they're infrastructure
/// endpoints, not part of the versioned API surface.
pub fn api_v1() -> Router<AppState> {
    Router::new()
        .merge(pools::router())
        .merge(accounts::router())
        .merge(search::router())
        .merge(schema::router())
        .merge(discovery::router())
        .merge(analysis::router())
        .merge(recommendations::router())
        .merge(auth::router())
        .merge(audit::router())
}

pub fn infra() -> Router<AppState> {
    health::router()
}
