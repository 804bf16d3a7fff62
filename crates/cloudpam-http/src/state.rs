use std::sync::Arc;

use cloudpam_auth::{ApiKeyService, LoginRateLimiter, SessionService, TrustedProxies};
use cloudpam_engine::{AnalysisService, DiscoveryService, HierarchyService, RecommendationService, SchemaPlanService, SearchService};
use cloudpam_metrics::Metrics;
use cloudpam_store::Store;

use crate::error_sink::SentrySink;

/// Session-cookie knobs that vary between a local dev run (plain HTTP) and
/// a TLS-terminated deployment.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "cloudpam_session".to_owned(),
            secure: true,
        }
    }
}

/// Everything a handler needs, assembled once at startup and shared via
/// `axum::extract::State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub hierarchy: Arc<HierarchyService>,
    pub discovery: Arc<DiscoveryService>,
    pub schema_plan: Arc<SchemaPlanService>,
    pub search: Arc<SearchService>,
    pub analysis: Arc<AnalysisService>,
    pub recommendations: Arc<RecommendationService>,
    pub sessions: Arc<SessionService>,
    pub api_keys: Arc<ApiKeyService>,
    pub login_limiter: Arc<LoginRateLimiter>,
    pub trusted_proxies: Arc<TrustedProxies>,
    pub metrics: Arc<Metrics>,
    pub cookies: CookieConfig,
    pub error_sink: Arc<dyn SentrySink>,
}
