//! CloudPAM server entry point: loads configuration, wires the chosen
//! storage backend into the engine and auth services, builds the HTTP
//! router, and serves it until cancelled.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cloudpam_audit::{AuditSink, StoreAuditSink};
use cloudpam_auth::{ApiKeyService, LoginRateLimiter, SessionConfig, SessionService, TrustedProxies};
use cloudpam_auth::{hash_password, HashCost};
use cloudpam_cidr::Cidr;
use cloudpam_core::model::{NewUser, Role, DEFAULT_ORG_ID};
use cloudpam_engine::{AnalysisService, DiscoveryService, HierarchyService, RecommendationService, SchemaPlanService, SearchService};
use cloudpam_http::error_sink::NoopSentrySink;
use cloudpam_http::state::{AppState, CookieConfig};
use cloudpam_metrics::Metrics;
use cloudpam_store::{Store, StoreError};
use cloudpam_store_memory::MemoryStore;
use cloudpam_store_sea::SeaStore;

use config::{Args, Backend, Config};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

fn init_logging(cfg: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| cfg.level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    if cfg.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_store(db: &config::DatabaseConfig) -> Result<Arc<dyn Store>> {
    let app_version = env!("CARGO_PKG_VERSION");
    match db.backend {
        Backend::Memory => Ok(Arc::new(MemoryStore::new())),
        Backend::Sqlite => {
            let store = SeaStore::connect_sqlite(&db.dsn, app_version)
                .await
                .context("connecting to sqlite backend")?;
            Ok(Arc::new(store))
        }
        Backend::Postgres => {
            let store = SeaStore::connect_postgres(&db.dsn, app_version)
                .await
                .context("connecting to postgres backend")?;
            Ok(Arc::new(store))
        }
    }
}

fn parse_trusted_proxies(entries: &[String]) -> Result<Vec<Cidr>> {
    entries
        .iter()
        .map(|s| Cidr::parse(s, true).with_context(|| format!("invalid trusted proxy CIDR {s:?}")))
        .collect()
}

/// Creates the configured admin user on first run. A no-op once that
/// username already exists, so restarts never reset its password.
async fn bootstrap_admin(store: &Arc<dyn Store>, admin: &config::AdminBootstrapConfig) -> Result<()> {
    match store.get_user_by_username(DEFAULT_ORG_ID, &admin.username).await {
        Ok(_) => {
            tracing::info!(username = %admin.username, "admin user already present, skipping bootstrap");
            Ok(())
        }
        Err(StoreError::NotFound) => {
            let password_hash = hash_password(&admin.password, HashCost::default()).context("hashing admin bootstrap password")?;
            store
                .create_user(NewUser {
                    org_id: DEFAULT_ORG_ID,
                    username: admin.username.clone(),
                    email: admin.email.clone(),
                    display_name: admin.username.clone(),
                    role: Role::Admin,
                    password_hash,
                })
                .await
                .context("creating admin bootstrap user")?;
            tracing::info!(username = %admin.username, "created admin bootstrap user");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn spawn_session_cleanup(store: Arc<dyn Store>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.cleanup_expired_sessions(chrono::Utc::now()).await {
                        Ok(n) if n > 0 => tracing::info!(expired = n, "cleaned up expired sessions"),
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "session cleanup failed"),
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(&args.config).context("loading configuration")?;

    init_logging(&cfg.logging);
    tracing::info!(listen = %cfg.listen_address, backend = ?cfg.database.backend, "starting cloudpam-server");

    let store = build_store(&cfg.database).await?;
    bootstrap_admin(&store, &cfg.admin).await?;

    let audit: Arc<dyn AuditSink> = Arc::new(StoreAuditSink::new(store.clone()));

    let hierarchy = Arc::new(HierarchyService::new(store.clone(), audit.clone()));
    let discovery = Arc::new(DiscoveryService::new(store.clone(), audit.clone(), cfg.discovery.auto_approve_agents));
    let schema_plan = Arc::new(SchemaPlanService::new(store.clone(), audit.clone()));
    let search = Arc::new(SearchService::new(store.clone()));
    let analysis = Arc::new(AnalysisService::new(store.clone()));
    let recommendations = Arc::new(RecommendationService::new(store.clone(), audit.clone()));

    let sessions = Arc::new(SessionService::new(store.clone(), SessionConfig::default()));
    let api_keys = Arc::new(ApiKeyService::new(store.clone()));
    let login_limiter = Arc::new(LoginRateLimiter::new(cfg.rate_limit.login_per_minute));
    let trusted_proxies = Arc::new(TrustedProxies::new(parse_trusted_proxies(&cfg.trusted_proxies)?));
    let metrics = Arc::new(Metrics::new(&cfg.metrics.namespace).context("registering metrics")?);

    let state = AppState {
        store: store.clone(),
        hierarchy,
        discovery,
        schema_plan,
        search,
        analysis,
        recommendations,
        sessions,
        api_keys,
        login_limiter,
        trusted_proxies,
        metrics,
        cookies: CookieConfig { secure: cfg.cookie_secure, ..CookieConfig::default() },
        error_sink: Arc::new(NoopSentrySink),
    };

    let app = cloudpam_http::build_router(state);

    let addr: SocketAddr = cfg.listen_address.parse().with_context(|| format!("invalid listen address {:?}", cfg.listen_address))?;
    let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    let cancel = CancellationToken::new();
    spawn_session_cleanup(store.clone(), cancel.clone());

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            wait_for_signal().await;
            tracing::info!("shutdown signal received, draining in-flight requests");
            cancel.cancel();
        }
    };

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    store.close().await.context("closing store")?;
    tracing::info!("shut down cleanly");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.ok() };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
