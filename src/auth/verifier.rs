// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! [`TokenVerifier`] is the seam between the auth service and a concrete
//! identity provider. [`KeycloakTokenVerifier`] verifies RS/ES-signed access
//! tokens against the realm's published JWKS:
//!
//! 1. Read `kid` from the unverified header
//! 2. Try every cached key matching `kid` (or every key when there is none)
//! 3. On failure, refresh the JWKS once, ignoring the TTL, and try again
//! 4. Map the verified claims to a [`Principal`]

use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;

use super::claims::KeycloakClaims;
use super::error::AuthError;
use super::jwks::{candidate_keys, JwksManager};
use super::principal::Principal;

/// Turns a raw bearer token into a verified [`Principal`].
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<Principal, AuthError>;
}

/// Verifies Keycloak access tokens against the realm JWKS.
pub struct KeycloakTokenVerifier {
    issuer: String,
    audience: Option<String>,
    jwks: JwksManager,
}

impl KeycloakTokenVerifier {
    /// Create a verifier for `issuer`.
    ///
    /// A blank `audience` disables audience validation.
    pub fn new(issuer: impl Into<String>, audience: Option<String>, jwks: JwksManager) -> Self {
        let audience = audience
            .map(|aud| aud.trim().to_string())
            .filter(|aud| !aud.is_empty());

        Self {
            issuer: issuer.into(),
            audience,
            jwks,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        // exp and nbf are enforced to the second.
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);

        match &self.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.set_required_spec_claims(&["exp", "iss", "aud"]);
            }
            None => {
                validation.validate_aud = false;
                validation.set_required_spec_claims(&["exp", "iss"]);
            }
        }

        validation
    }

    /// Try each candidate key in order, returning the first verified payload.
    fn try_decode(&self, token: &str, kid: Option<&str>, keys: &[Jwk]) -> Option<Value> {
        for (key, algorithm) in candidate_keys(keys, kid) {
            match decode::<Value>(token, &key, &self.validation(algorithm)) {
                Ok(data) => return Some(data.claims),
                Err(e) => {
                    tracing::debug!(kid, error = ?e.kind(), "token rejected by candidate key");
                }
            }
        }
        None
    }

    async fn decode_with_jwks(&self, token: &str, kid: Option<&str>) -> Result<Value, AuthError> {
        let keys = self.jwks.keys().await?;
        if let Some(claims) = self.try_decode(token, kid, &keys) {
            return Ok(claims);
        }

        // The signing key may have rotated since the last fetch.
        tracing::debug!(kid, "no cached key verified the token, refreshing JWKS");
        let keys = self.jwks.refresh().await?;
        self.try_decode(token, kid, &keys)
            .ok_or_else(AuthError::invalid_token)
    }
}

#[async_trait]
impl TokenVerifier for KeycloakTokenVerifier {
    async fn verify(&self, access_token: &str) -> Result<Principal, AuthError> {
        let header = decode_header(access_token).map_err(|e| {
            tracing::debug!(error = ?e.kind(), "malformed token header");
            AuthError::invalid_token()
        })?;

        let payload = self
            .decode_with_jwks(access_token, header.kid.as_deref())
            .await?;

        KeycloakClaims::from_value(&payload).into_principal()
    }
}
