#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use scriptvault::clock::ManualClock;
use scriptvault::config::{AccountSeed, Config, ScriptSeed, SecurityConfig};
use scriptvault::models::{Role, content_digest};
use scriptvault::services::hash_password;
use scriptvault::state::SharedState;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tower::ServiceExt;

pub const ADMIN_SECRET: &str = "admin-secret";
pub const ALICE_SECRET: &str = "correct-secret";
pub const BOB_SECRET: &str = "bob-secret";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<SharedState>,
    pub clock: Arc<ManualClock>,
    next_peer: AtomicU32,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

fn fast_security() -> SecurityConfig {
    SecurityConfig {
        argon2_memory_cost_kib: 64,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        ..SecurityConfig::default()
    }
}

fn account(
    id: u64,
    username: &str,
    secret: &str,
    role: Role,
    security: &SecurityConfig,
) -> AccountSeed {
    AccountSeed {
        id,
        username: username.to_string(),
        password_hash: hash_password(secret, Some(security)).unwrap(),
        role,
        active: true,
    }
}

fn script(id: &str, owner: u64, is_public: bool) -> ScriptSeed {
    ScriptSeed {
        id: id.to_string(),
        name: format!("{id}.sh"),
        description: format!("Test script {id}"),
        language: "bash".to_string(),
        category: "utility".to_string(),
        date_added: "2023-10-15".to_string(),
        owner_account_id: owner,
        is_public,
        access_level: 1,
        download_count: 0,
        source_code: format!("#!/bin/sh\necho {id}\n"),
        integrity_hash: None,
    }
}

/// admin (1), alice (2), bob (3) and a disabled carol (4). Scripts:
/// `script-001` public, `script-002` alice's, `script-003` bob's and
/// `script-004` public but tampered with.
pub fn test_config() -> Config {
    let security = fast_security();

    let mut carol = account(4, "carol", "carol-secret", Role::User, &security);
    carol.active = false;

    let mut tampered = script("script-004", 1, true);
    tampered.integrity_hash = Some(content_digest("echo original"));

    Config {
        accounts: vec![
            account(1, "admin", ADMIN_SECRET, Role::Admin, &security),
            account(2, "alice", ALICE_SECRET, Role::User, &security),
            account(3, "bob", BOB_SECRET, Role::User, &security),
            carol,
        ],
        scripts: vec![
            script("script-001", 1, true),
            script("script-002", 2, false),
            script("script-003", 3, false),
            tampered,
        ],
        security,
        ..Config::default()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = test_config();
    customize(&mut config);
    config.validate().expect("test config should be valid");

    let clock = Arc::new(ManualClock::default());
    let state = Arc::new(
        SharedState::with_clock(config, clock.clone())
            .await
            .expect("Failed to create shared state"),
    );
    let api_state = scriptvault::api::create_app_state(state.clone(), None)
        .expect("Failed to create app state");

    TestApp {
        router: scriptvault::api::router(api_state),
        state,
        clock,
        next_peer: AtomicU32::new(1),
    }
}

impl TestApp {
    /// A fresh peer address, so unrelated requests don't share a rate-limit bucket.
    pub fn fresh_peer(&self) -> String {
        let n = self.next_peer.fetch_add(1, Ordering::SeqCst);
        format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff)
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        peer: &str,
        body: Body,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("user-agent", "integration-test");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let mut request = builder.body(body).unwrap();
        let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let peer = self.fresh_peer();
        self.send(self.request(Method::GET, uri, token, &peer, Body::empty()))
            .await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let peer = self.fresh_peer();
        self.send(self.request(Method::POST, uri, token, &peer, Body::empty()))
            .await
    }

    pub async fn login_from(&self, username: &str, secret: &str, peer: &str) -> TestResponse {
        let body = serde_json::json!({ "username": username, "secret": secret }).to_string();
        self.send(self.request(Method::POST, "/api/login", None, peer, Body::from(body)))
            .await
    }

    pub async fn login(&self, username: &str, secret: &str) -> TestResponse {
        let peer = self.fresh_peer();
        self.login_from(username, secret, &peer).await
    }

    /// Logs in and returns the token, panicking on failure.
    pub async fn token_for(&self, username: &str, secret: &str) -> String {
        let response = self.login(username, secret).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }
}
