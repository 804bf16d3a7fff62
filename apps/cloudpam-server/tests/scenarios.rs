//! End-to-end scenarios driven straight through the router, no socket
//! involved — the same `tower::ServiceExt::oneshot` idiom the api-gateway
//! crate's own middleware tests use.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use cloudpam_audit::{AuditSink, StoreAuditSink};
use cloudpam_auth::{hash_password, ApiKeyService, HashCost, LoginRateLimiter, SessionConfig, SessionService, TrustedProxies};
use cloudpam_core::model::{NewUser, Role, DEFAULT_ORG_ID};
use cloudpam_engine::{AnalysisService, DiscoveryService, HierarchyService, RecommendationService, SchemaPlanService, SearchService};
use cloudpam_http::error_sink::NoopSentrySink;
use cloudpam_http::state::{AppState, CookieConfig};
use cloudpam_metrics::Metrics;
use cloudpam_store::Store;
use cloudpam_store_memory::MemoryStore;

const PEER: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10)), 54321);

async fn test_state() -> AppState {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let audit: Arc<dyn AuditSink> = Arc::new(StoreAuditSink::new(store.clone()));

    let password_hash = hash_password("correct horse battery staple", HashCost::default()).unwrap();
    store
        .create_user(NewUser {
            org_id: DEFAULT_ORG_ID,
            username: "admin".into(),
            email: "admin@cloudpam.local".into(),
            display_name: "admin".into(),
            role: Role::Admin,
            password_hash,
        })
        .await
        .unwrap();

    AppState {
        hierarchy: Arc::new(HierarchyService::new(store.clone(), audit.clone())),
        discovery: Arc::new(DiscoveryService::new(store.clone(), audit.clone(), false)),
        schema_plan: Arc::new(SchemaPlanService::new(store.clone(), audit.clone())),
        search: Arc::new(SearchService::new(store.clone())),
        analysis: Arc::new(AnalysisService::new(store.clone())),
        recommendations: Arc::new(RecommendationService::new(store.clone(), audit.clone())),
        sessions: Arc::new(SessionService::new(store.clone(), SessionConfig::default())),
        api_keys: Arc::new(ApiKeyService::new(store.clone())),
        login_limiter: Arc::new(LoginRateLimiter::new(5)),
        trusted_proxies: Arc::new(TrustedProxies::new(vec![])),
        metrics: Arc::new(Metrics::new("cloudpam_test").unwrap()),
        store,
        cookies: CookieConfig { secure: false, ..CookieConfig::default() },
        error_sink: Arc::new(NoopSentrySink),
    }
}

struct TestApp {
    router: axum::Router,
}

impl TestApp {
    async fn new() -> Self {
        Self { router: cloudpam_http::build_router(test_state().await) }
    }

    async fn request(&self, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let mut req = builder.body(body).unwrap();
        req.extensions_mut().insert(ConnectInfo(PEER));

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let set_cookie = response.headers().get("set-cookie").and_then(|v| v.to_str().ok()).map(|s| s.split(';').next().unwrap().to_owned());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, set_cookie, json)
    }

    async fn login(&self) -> String {
        let (status, cookie, _) = self.request("POST", "/api/v1/auth/login", None, Some(json!({"username": "admin", "password": "correct horse battery staple"}))).await;
        assert_eq!(status, StatusCode::OK);
        cookie.expect("login sets a session cookie")
    }

    /// Discovered resources and bootstrap tokens are only visible for an
    /// account that exists, so the discovery scenarios create one first.
    async fn create_account(&self, session: &str, key: &str) -> i64 {
        let (status, _, body) = self
            .request("POST", "/api/v1/accounts", Some(session), Some(json!({"key": key, "name": key})))
            .await;
        assert_eq!(status, StatusCode::OK, "body: {body}");
        body["id"].as_i64().unwrap()
    }
}

/// Scenario 1: supernet + child pool, stats roll up over the child.
#[tokio::test]
async fn pool_hierarchy_and_stats() {
    let app = TestApp::new().await;
    let session = app.login().await;

    let (status, _, supernet) = app
        .request(
            "POST",
            "/api/v1/pools",
            Some(&session),
            Some(json!({"name": "supernet", "cidr": "10.0.0.0/8", "pool_type": "supernet"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let supernet_id = supernet["id"].as_i64().unwrap();

    let (status, _, child) = app
        .request(
            "POST",
            "/api/v1/pools",
            Some(&session),
            Some(json!({"name": "region", "cidr": "10.1.0.0/16", "parent_id": supernet_id, "pool_type": "region"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(child["parent_id"], supernet_id);

    let (status, _, stats) = app.request("GET", &format!("/api/v1/pools/{supernet_id}/stats"), Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_ips"], 16_777_216u64);
    assert_eq!(stats["used_ips"], 65_536u64);
    assert_eq!(stats["available_ips"], 16_711_680u64);
    assert_eq!(stats["direct_children"], 1);
    let utilization = stats["utilization_pct"].as_f64().unwrap();
    assert!((utilization - 0.39).abs() < 0.01, "utilization was {utilization}");
}

/// Scenario 2: a sibling pool overlapping an existing child is a conflict.
#[tokio::test]
async fn overlapping_child_pool_is_a_conflict() {
    let app = TestApp::new().await;
    let session = app.login().await;

    let (_, _, supernet) = app
        .request("POST", "/api/v1/pools", Some(&session), Some(json!({"name": "supernet", "cidr": "10.0.0.0/8", "pool_type": "supernet"})))
        .await;
    let supernet_id = supernet["id"].as_i64().unwrap();
    app.request(
        "POST",
        "/api/v1/pools",
        Some(&session),
        Some(json!({"name": "region", "cidr": "10.1.0.0/16", "parent_id": supernet_id, "pool_type": "region"})),
    )
    .await;

    let (status, _, body) = app
        .request(
            "POST",
            "/api/v1/pools",
            Some(&session),
            Some(json!({"name": "overlap", "cidr": "10.1.128.0/17", "parent_id": supernet_id, "pool_type": "region"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "body: {body}");
}

/// Scenario 3: paginated /16 block enumeration under the /8.
#[tokio::test]
async fn block_enumeration_is_paginated() {
    let app = TestApp::new().await;
    let session = app.login().await;

    let (_, _, supernet) = app
        .request("POST", "/api/v1/pools", Some(&session), Some(json!({"name": "supernet", "cidr": "10.0.0.0/8", "pool_type": "supernet"})))
        .await;
    let supernet_id = supernet["id"].as_i64().unwrap();
    app.request(
        "POST",
        "/api/v1/pools",
        Some(&session),
        Some(json!({"name": "region", "cidr": "10.1.0.0/16", "parent_id": supernet_id, "pool_type": "region"})),
    )
    .await;

    let (status, _, body) = app
        .request("GET", &format!("/api/v1/pools/{supernet_id}/blocks?new_prefix_len=16&page_size=4&page=1"), Some(&session), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 256);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0]["cidr"], "10.0.0.0/16");
    assert_eq!(items[0]["assigned_pool_id"], Value::Null);
    assert_eq!(items[1]["cidr"], "10.1.0.0/16");
    assert_eq!(items[1]["assigned_pool_id"], supernet_id + 1);
    assert_eq!(items[2]["cidr"], "10.2.0.0/16");
    assert_eq!(items[3]["cidr"], "10.3.0.0/16");
}

/// Scenario 4: searching by an address that falls inside both pools
/// returns both ancestors.
#[tokio::test]
async fn search_by_containing_cidr() {
    let app = TestApp::new().await;
    let session = app.login().await;

    let (_, _, supernet) = app
        .request("POST", "/api/v1/pools", Some(&session), Some(json!({"name": "supernet", "cidr": "10.0.0.0/8", "pool_type": "supernet"})))
        .await;
    let supernet_id = supernet["id"].as_i64().unwrap();
    let (_, _, child) = app
        .request(
            "POST",
            "/api/v1/pools",
            Some(&session),
            Some(json!({"name": "region", "cidr": "10.1.0.0/16", "parent_id": supernet_id, "pool_type": "region"})),
        )
        .await;
    let child_id = child["id"].as_i64().unwrap();

    let (status, _, body) = app.request("GET", "/api/v1/search?cidr_contains=10.1.2.3", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|hit| hit["pool"]["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&supernet_id), "missing supernet in {ids:?}");
    assert!(ids.contains(&child_id), "missing child in {ids:?}");
    for hit in body["items"].as_array().unwrap() {
        assert_eq!(hit["kind"], "pool");
    }
}

/// Scenario 5: a single-use bootstrap token registers one agent and is
/// then exhausted — the second attempt is a 401, not a second agent.
#[tokio::test]
async fn bootstrap_token_is_single_use() {
    let app = TestApp::new().await;
    let session = app.login().await;
    let account_id = app.create_account(&session, "acct-bootstrap").await;

    let (status, _, token_body) = app
        .request("POST", "/api/v1/discovery/tokens", Some(&session), Some(json!({"name": "t1", "account_id": account_id, "max_uses": 1})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let raw_token = token_body["raw_token"].as_str().unwrap().to_owned();

    let register_body = json!({"name": "agent-1", "account_id": account_id, "token": raw_token, "version": "1.0", "hostname": "host-a"});
    let (status, _, first) = app.request("POST", "/api/v1/discovery/register", None, Some(register_body.clone())).await;
    assert_eq!(status, StatusCode::OK, "body: {first}");
    assert!(first["agent_id"].is_string());

    let (status, _, second) = app.request("POST", "/api/v1/discovery/register", None, Some(register_body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "body: {second}");
}

/// Scenario 6: a resource absent from two consecutive ingests goes
/// stale, then is tombstoned on a third.
#[tokio::test]
async fn ingest_marks_missing_resources_stale_then_deleted() {
    let app = TestApp::new().await;
    let session = app.login().await;
    let account_id = app.create_account(&session, "acct-ingest").await;

    let subnet = json!({
        "provider": "aws",
        "type": "subnet",
        "resource_id": "subnet-0001",
        "cidr": "10.50.0.0/24",
    });

    let (status, _, _) = app
        .request("POST", "/api/v1/discovery/ingest", Some(&session), Some(json!({"account_id": account_id, "resources": [subnet]})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app
        .request("POST", "/api/v1/discovery/ingest", Some(&session), Some(json!({"account_id": account_id, "resources": []})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, resources) = app.request("GET", &format!("/api/v1/discovery/resources?account_id={account_id}"), Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = resources["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "stale");

    let (status, _, _) = app
        .request("POST", "/api/v1/discovery/ingest", Some(&session), Some(json!({"account_id": account_id, "resources": []})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, resources) = app.request("GET", &format!("/api/v1/discovery/resources?account_id={account_id}"), Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resources["items"].as_array().unwrap()[0]["status"], "deleted");
}

/// Scenario 7: five failed logins from one IP inside a minute are 401s,
/// the sixth is rate limited.
#[tokio::test]
async fn login_rate_limit_kicks_in_on_the_sixth_attempt() {
    let app = TestApp::new().await;

    for attempt in 1..=5 {
        let (status, _, body) = app
            .request("POST", "/api/v1/auth/login", None, Some(json!({"username": "nobody", "password": "wrong"})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "attempt {attempt} body: {body}");
    }

    let (status, _, body) = app
        .request("POST", "/api/v1/auth/login", None, Some(json!({"username": "nobody", "password": "wrong"})))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "body: {body}");
}
