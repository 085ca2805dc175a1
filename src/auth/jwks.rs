// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OIDC discovery and JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Cache lifecycle
//!
//! - The discovery document is fetched on first use and kept for the life of
//!   the process.
//! - The key set moves through `Empty -> Fresh -> Stale`. A stale or empty
//!   cache is refetched on the next lookup; [`JwksManager::refresh`] bypasses
//!   the TTL entirely.
//! - Locks are held only to read or swap the cached value, never across a
//!   network call. Concurrent callers may fetch redundantly; the last
//!   completed fetch wins.
//! - A failed fetch leaves the previous cache contents untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Timeout applied to every discovery and JWKS request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the HTTP client used for identity-provider requests.
pub fn http_client(verify_tls: bool) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .danger_accept_invalid_certs(!verify_tls)
        .build()
}

/// The subset of the OIDC discovery document this service relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfiguration {
    pub jwks_uri: String,
}

impl OidcConfiguration {
    fn from_value(payload: &Value) -> Result<Self, AuthError> {
        let document = payload.as_object().ok_or_else(|| {
            AuthError::provider_unavailable("OIDC configuration payload is invalid.")
        })?;

        let jwks_uri = document
            .get("jwks_uri")
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| AuthError::provider_unavailable("OIDC config is missing jwks_uri."))?;

        Ok(Self {
            jwks_uri: jwks_uri.to_string(),
        })
    }
}

/// Observable state of the key cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing fetched yet (or every fetch so far failed).
    Empty,
    /// Keys are younger than the TTL.
    Fresh,
    /// Keys are present but older than the TTL.
    Stale,
}

/// JWKS cache entry.
struct CacheEntry {
    keys: Arc<Vec<Jwk>>,
    fetched_at: Instant,
}

/// JWKS manager with caching.
///
/// Resolves the JWKS endpoint through the issuer's discovery document and
/// caches the published keys for token verification.
#[derive(Clone)]
pub struct JwksManager {
    /// Discovery document URL
    oidc_config_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Discovery document, cached forever once fetched
    oidc_config: Arc<RwLock<Option<Arc<OidcConfiguration>>>>,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager around a prepared HTTP client.
    ///
    /// # Arguments
    /// - `oidc_config_url`: e.g. `https://sso.example.com/realms/main/.well-known/openid-configuration`
    /// - `client`: see [`http_client`]
    pub fn new(oidc_config_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            oidc_config_url: oidc_config_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            oidc_config: Arc::new(RwLock::new(None)),
            cache: Arc::new(RwLock::new(None)),
            client,
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn oidc_config_url(&self) -> &str {
        &self.oidc_config_url
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Current cache state.
    pub async fn state(&self) -> CacheState {
        let cache = self.cache.read().await;
        match &*cache {
            None => CacheState::Empty,
            Some(entry) if entry.fetched_at.elapsed() < self.cache_ttl => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        self.state().await == CacheState::Fresh
    }

    /// Get the key set, fetching it when the cache is empty or stale.
    pub async fn keys(&self) -> Result<Arc<Vec<Jwk>>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.keys.clone());
                }
            }
        }

        self.refresh().await
    }

    /// Force refresh the JWKS cache, ignoring the TTL.
    pub async fn refresh(&self) -> Result<Arc<Vec<Jwk>>, AuthError> {
        let config = self.oidc_config().await?;
        let keys = Arc::new(self.fetch_jwks(&config.jwks_uri).await?);

        {
            let mut cache = self.cache.write().await;
            *cache = Some(CacheEntry {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            });
        }

        tracing::info!(keys = keys.len(), "JWKS cache refreshed");
        Ok(keys)
    }

    /// Get the discovery document, fetching it on first use.
    pub async fn oidc_config(&self) -> Result<Arc<OidcConfiguration>, AuthError> {
        if let Some(config) = &*self.oidc_config.read().await {
            return Ok(config.clone());
        }

        let payload = self
            .get_json(&self.oidc_config_url, "Cannot load OIDC configuration.")
            .await?;
        let config = Arc::new(OidcConfiguration::from_value(&payload)?);

        let mut cached = self.oidc_config.write().await;
        *cached = Some(config.clone());
        tracing::debug!(jwks_uri = %config.jwks_uri, "OIDC configuration loaded");
        Ok(config)
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<Vec<Jwk>, AuthError> {
        let payload = self.get_json(jwks_uri, "Cannot load JWKS keys.").await?;
        parse_key_set(&payload)
    }

    async fn get_json(&self, url: &str, failure: &str) -> Result<Value, AuthError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(url, error = %e, "identity provider request failed");
            AuthError::provider_unavailable(failure)
        })?;

        if !response.status().is_success() {
            tracing::warn!(url, status = %response.status(), "identity provider returned an error status");
            return Err(AuthError::provider_unavailable(failure));
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::warn!(url, error = %e, "identity provider returned an unreadable body");
            AuthError::provider_unavailable(failure)
        })
    }
}

/// Parse a JWKS document.
///
/// The document itself must be a JSON object. A missing or non-list `keys`
/// field yields an empty set, and entries that are not valid JWKs are skipped.
fn parse_key_set(payload: &Value) -> Result<Vec<Jwk>, AuthError> {
    let document = payload
        .as_object()
        .ok_or_else(|| AuthError::provider_unavailable("JWKS payload is invalid."))?;

    let Some(entries) = document.get("keys").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    Ok(entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Jwk>(entry.clone()) {
            Ok(jwk) => Some(jwk),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable JWK");
                None
            }
        })
        .collect())
}

/// Keys eligible to verify a token with the given `kid`.
///
/// With a `kid`, only exact matches are kept; without one every key is a
/// candidate. Encryption keys and key types that cannot verify signatures
/// are dropped.
pub fn candidate_keys(keys: &[Jwk], kid: Option<&str>) -> Vec<(DecodingKey, Algorithm)> {
    keys.iter()
        .filter(|jwk| match kid {
            Some(kid) => jwk.common.key_id.as_deref() == Some(kid),
            None => true,
        })
        .filter(|jwk| !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)))
        .filter_map(jwk_to_decoding_key)
        .collect()
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<(DecodingKey, Algorithm)> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok()?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::PS256) => Algorithm::PS256,
                Some(KeyAlgorithm::PS384) => Algorithm::PS384,
                Some(KeyAlgorithm::PS512) => Algorithm::PS512,
                _ => Algorithm::RS256,
            };

            Some((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let alg = match (jwk.common.key_algorithm, &ec.curve) {
                (Some(KeyAlgorithm::ES256), _) => Algorithm::ES256,
                (Some(KeyAlgorithm::ES384), _) => Algorithm::ES384,
                (_, EllipticCurve::P256) => Algorithm::ES256,
                (_, EllipticCurve::P384) => Algorithm::ES384,
                _ => return None,
            };
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y).ok()?;

            Some((key, alg))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{
        test_client, test_client_with_timeout, KeyPair, MockIdentityProvider,
    };
    use serde_json::json;

    #[test]
    fn manager_defaults() {
        let manager = JwksManager::new(
            "https://sso.example.com/realms/main/.well-known/openid-configuration",
            test_client(),
        );
        assert_eq!(
            manager.oidc_config_url(),
            "https://sso.example.com/realms/main/.well-known/openid-configuration"
        );
        assert_eq!(manager.cache_ttl(), DEFAULT_CACHE_TTL);
    }

    #[test]
    fn custom_cache_ttl() {
        let manager = JwksManager::new("https://example.com/oidc", test_client())
            .with_cache_ttl(Duration::from_secs(60));
        assert_eq!(manager.cache_ttl(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cache_initially_empty() {
        let manager = JwksManager::new("https://example.com/oidc", test_client());
        assert_eq!(manager.state().await, CacheState::Empty);
        assert!(!manager.is_cached().await);
    }

    #[test]
    fn discovery_document_requires_jwks_uri() {
        let err = OidcConfiguration::from_value(&json!({"issuer": "x"})).expect_err("no uri");
        assert!(matches!(err, AuthError::IdentityProviderUnavailable(_)));

        let err = OidcConfiguration::from_value(&json!({"jwks_uri": ""})).expect_err("empty");
        assert!(matches!(err, AuthError::IdentityProviderUnavailable(_)));

        let err = OidcConfiguration::from_value(&json!("jwks_uri")).expect_err("not a document");
        assert!(matches!(err, AuthError::IdentityProviderUnavailable(_)));

        let config =
            OidcConfiguration::from_value(&json!({"jwks_uri": "https://x/certs"})).unwrap();
        assert_eq!(config.jwks_uri, "https://x/certs");
    }

    #[test]
    fn key_set_parsing_is_lenient_about_entries() {
        let primary = KeyPair::primary();
        let payload = json!({
            "keys": [
                primary.jwk_json("k1"),
                {"kty": "unknown"},
                "garbage"
            ]
        });
        let keys = parse_key_set(&payload).expect("document parses");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].common.key_id.as_deref(), Some("k1"));

        assert!(parse_key_set(&json!({"keys": "nope"})).unwrap().is_empty());
        assert!(parse_key_set(&json!({})).unwrap().is_empty());
        assert!(matches!(
            parse_key_set(&json!([1, 2])),
            Err(AuthError::IdentityProviderUnavailable(_))
        ));
    }

    #[test]
    fn candidate_keys_filter_by_kid() {
        let primary = KeyPair::primary();
        let rotated = KeyPair::rotated();
        let keys = parse_key_set(&json!({
            "keys": [primary.jwk_json("k1"), rotated.jwk_json("k2")]
        }))
        .unwrap();

        assert_eq!(candidate_keys(&keys, Some("k1")).len(), 1);
        assert_eq!(candidate_keys(&keys, Some("k3")).len(), 0);
        assert_eq!(candidate_keys(&keys, None).len(), 2);
    }

    #[test]
    fn candidate_keys_skip_encryption_keys() {
        let primary = KeyPair::primary();
        let mut enc = primary.jwk_json("enc-1");
        enc["use"] = json!("enc");
        let keys = parse_key_set(&json!({"keys": [enc]})).unwrap();
        assert!(candidate_keys(&keys, None).is_empty());
    }

    fn ec_jwk(curve: &str, coordinate_len: usize, alg: Option<&str>) -> Jwk {
        // All-zero coordinates: only the algorithm selection is under test.
        let coordinate = "A".repeat((coordinate_len * 4).div_ceil(3));
        let mut jwk = json!({
            "kid": "ec-1",
            "kty": "EC",
            "crv": curve,
            "x": coordinate,
            "y": coordinate
        });
        if let Some(alg) = alg {
            jwk["alg"] = json!(alg);
        }
        serde_json::from_value(jwk).expect("ec jwk")
    }

    #[test]
    fn ec_algorithm_follows_curve_when_alg_is_absent() {
        let (_, alg) = jwk_to_decoding_key(&ec_jwk("P-256", 32, None)).expect("p-256");
        assert_eq!(alg, Algorithm::ES256);

        let (_, alg) = jwk_to_decoding_key(&ec_jwk("P-384", 48, None)).expect("p-384");
        assert_eq!(alg, Algorithm::ES384);

        let (_, alg) = jwk_to_decoding_key(&ec_jwk("P-384", 48, Some("ES384"))).expect("explicit");
        assert_eq!(alg, Algorithm::ES384);

        assert!(jwk_to_decoding_key(&ec_jwk("P-521", 66, None)).is_none());
    }

    #[tokio::test]
    async fn keys_are_cached_within_ttl() {
        let idp = MockIdentityProvider::start(vec![KeyPair::primary().jwk_json("k1")]).await;
        let manager = JwksManager::new(idp.oidc_config_url(), test_client());

        let first = manager.keys().await.expect("first fetch");
        let second = manager.keys().await.expect("cached");

        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(idp.jwks_hits(), 1);
        assert_eq!(idp.discovery_hits(), 1);
        assert_eq!(manager.state().await, CacheState::Fresh);
    }

    #[tokio::test]
    async fn stale_cache_is_refetched_but_discovery_is_not() {
        let idp = MockIdentityProvider::start(vec![KeyPair::primary().jwk_json("k1")]).await;
        let manager = JwksManager::new(idp.oidc_config_url(), test_client())
            .with_cache_ttl(Duration::from_millis(50));

        manager.keys().await.expect("first fetch");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(manager.state().await, CacheState::Stale);

        manager.keys().await.expect("refetch");
        assert_eq!(idp.jwks_hits(), 2);
        assert_eq!(idp.discovery_hits(), 1);
    }

    #[tokio::test]
    async fn refresh_bypasses_ttl() {
        let idp = MockIdentityProvider::start(vec![KeyPair::primary().jwk_json("k1")]).await;
        let manager = JwksManager::new(idp.oidc_config_url(), test_client());

        manager.keys().await.expect("first fetch");
        idp.set_keys(vec![KeyPair::rotated().jwk_json("k2")]);
        let refreshed = manager.refresh().await.expect("refresh");

        assert_eq!(refreshed[0].common.key_id.as_deref(), Some("k2"));
        assert_eq!(idp.jwks_hits(), 2);
    }

    #[tokio::test]
    async fn failed_first_fetch_leaves_cache_empty() {
        let idp = MockIdentityProvider::start(vec![KeyPair::primary().jwk_json("k1")]).await;
        idp.fail_jwks(true);
        let manager = JwksManager::new(idp.oidc_config_url(), test_client());

        let err = manager.keys().await.expect_err("jwks unavailable");
        assert_eq!(err, AuthError::provider_unavailable("Cannot load JWKS keys."));
        assert_eq!(manager.state().await, CacheState::Empty);

        idp.fail_jwks(false);
        assert_eq!(manager.keys().await.expect("recovered").len(), 1);
    }

    #[tokio::test]
    async fn slow_jwks_endpoint_times_out_as_unavailable() {
        let idp = MockIdentityProvider::start(vec![KeyPair::primary().jwk_json("k1")]).await;
        idp.stall_jwks(Duration::from_secs(5));
        let manager = JwksManager::new(
            idp.oidc_config_url(),
            test_client_with_timeout(Duration::from_millis(200)),
        );

        let started = Instant::now();
        let err = manager.keys().await.expect_err("timed out");
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(err, AuthError::provider_unavailable("Cannot load JWKS keys."));
        assert_eq!(manager.state().await, CacheState::Empty);
        assert_eq!(idp.discovery_hits(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_keys() {
        let idp = MockIdentityProvider::start(vec![KeyPair::primary().jwk_json("k1")]).await;
        let manager = JwksManager::new(idp.oidc_config_url(), test_client());
        manager.keys().await.expect("first fetch");

        idp.fail_jwks(true);
        assert!(manager.refresh().await.is_err());
        assert_eq!(manager.state().await, CacheState::Fresh);
        assert_eq!(manager.keys().await.expect("cached").len(), 1);
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        // Port 9 (discard) on localhost is not served by anything in the test environment.
        let manager = JwksManager::new(
            "http://127.0.0.1:9/.well-known/openid-configuration",
            test_client(),
        );
        let err = manager.keys().await.expect_err("unreachable");
        assert_eq!(
            err,
            AuthError::provider_unavailable("Cannot load OIDC configuration.")
        );
    }
}
