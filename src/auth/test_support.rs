// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test fixtures: RSA signing keys and a local identity provider.
//!
//! The provider binds to `127.0.0.1:0` so tests never touch the network,
//! and counts discovery/JWKS requests so cache behaviour can be asserted.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

pub const REALM_PATH: &str = "/realms/test";

/// HTTP client for tests: short timeout, and no proxy so localhost is never hijacked.
pub fn test_client() -> reqwest::Client {
    test_client_with_timeout(Duration::from_secs(2))
}

pub fn test_client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .expect("test http client")
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// RSA key pair loaded from `tests/fixtures`.
pub struct KeyPair {
    encoding: EncodingKey,
    modulus: String,
}

impl KeyPair {
    pub fn primary() -> Self {
        Self::load(
            include_str!("../../tests/fixtures/primary_private.pem"),
            include_str!("../../tests/fixtures/primary_modulus.txt"),
        )
    }

    pub fn rotated() -> Self {
        Self::load(
            include_str!("../../tests/fixtures/rotated_private.pem"),
            include_str!("../../tests/fixtures/rotated_modulus.txt"),
        )
    }

    fn load(private_pem: &str, modulus: &str) -> Self {
        Self {
            encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("fixture key"),
            modulus: modulus.trim().to_string(),
        }
    }

    /// Public JWK for this key pair.
    pub fn jwk_json(&self, kid: &str) -> Value {
        json!({
            "kid": kid,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": self.modulus,
            "e": "AQAB"
        })
    }

    /// Sign `claims` with RS256.
    pub fn sign(&self, kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &self.encoding).expect("sign token")
    }
}

#[derive(Default)]
struct ProviderState {
    base_url: Mutex<String>,
    keys: Mutex<Vec<Value>>,
    discovery_hits: AtomicUsize,
    jwks_hits: AtomicUsize,
    fail_discovery: AtomicBool,
    fail_jwks: AtomicBool,
    jwks_delay_ms: AtomicU64,
}

/// Local Keycloak-like discovery + JWKS server.
pub struct MockIdentityProvider {
    addr: SocketAddr,
    state: Arc<ProviderState>,
}

impl MockIdentityProvider {
    pub async fn start(keys: Vec<Value>) -> Self {
        let state = Arc::new(ProviderState::default());
        *state.keys.lock().unwrap() = keys;

        let app = Router::new()
            .route(
                &format!("{REALM_PATH}/.well-known/openid-configuration"),
                get(discovery),
            )
            .route(
                &format!("{REALM_PATH}/protocol/openid-connect/certs"),
                get(certs),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        *state.base_url.lock().unwrap() = format!("http://{addr}");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });

        Self { addr, state }
    }

    pub fn issuer(&self) -> String {
        format!("http://{}{REALM_PATH}", self.addr)
    }

    pub fn oidc_config_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.issuer())
    }

    pub fn set_keys(&self, keys: Vec<Value>) {
        *self.state.keys.lock().unwrap() = keys;
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.state.fail_discovery.store(fail, Ordering::SeqCst);
    }

    pub fn fail_jwks(&self, fail: bool) {
        self.state.fail_jwks.store(fail, Ordering::SeqCst);
    }

    /// Delay every JWKS response by `delay`.
    pub fn stall_jwks(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.jwks_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn discovery_hits(&self) -> usize {
        self.state.discovery_hits.load(Ordering::SeqCst)
    }

    pub fn jwks_hits(&self) -> usize {
        self.state.jwks_hits.load(Ordering::SeqCst)
    }

    /// Standard claims for a valid token issued by this provider.
    pub fn claims(&self, subject: &str) -> Value {
        let issued_at = now();
        json!({
            "sub": subject,
            "iss": self.issuer(),
            "iat": issued_at,
            "exp": issued_at + 600,
            "preferred_username": "alice",
            "azp": "extension",
            "resource_access": {"extension": {"roles": ["active"]}}
        })
    }
}

async fn discovery(State(state): State<Arc<ProviderState>>) -> impl IntoResponse {
    state.discovery_hits.fetch_add(1, Ordering::SeqCst);
    if state.fail_discovery.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let base = state.base_url.lock().unwrap().clone();
    Json(json!({
        "issuer": format!("{base}{REALM_PATH}"),
        "jwks_uri": format!("{base}{REALM_PATH}/protocol/openid-connect/certs"),
    }))
    .into_response()
}

async fn certs(State(state): State<Arc<ProviderState>>) -> impl IntoResponse {
    state.jwks_hits.fetch_add(1, Ordering::SeqCst);
    let delay = state.jwks_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.fail_jwks.load(Ordering::SeqCst) {
        return StatusCode::BAD_GATEWAY.into_response();
    }

    let keys = state.keys.lock().unwrap().clone();
    Json(json!({ "keys": keys })).into_response()
}
