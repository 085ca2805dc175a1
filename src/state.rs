// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::jwks::http_client;
use crate::auth::{AuthService, JwksManager, KeycloakTokenVerifier};
use crate::config::Settings;
use crate::events::EventHub;
use crate::store::InMemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub auth: Arc<AuthService>,
    /// Key cache behind the Keycloak verifier, used by readiness checks.
    /// `None` when a non-Keycloak verifier is plugged in.
    pub jwks: Option<JwksManager>,
    pub store: Arc<RwLock<InMemoryStore>>,
    pub events: EventHub,
}

impl AppState {
    pub fn new(settings: Settings, auth: AuthService) -> Self {
        Self {
            settings: Arc::new(settings),
            auth: Arc::new(auth),
            jwks: None,
            store: Arc::new(RwLock::new(InMemoryStore::new())),
            events: EventHub::new(),
        }
    }

    pub fn with_jwks(mut self, jwks: JwksManager) -> Self {
        self.jwks = Some(jwks);
        self
    }

    /// Wire the Keycloak verifier and access policy described by `settings`.
    ///
    /// No request is made to Keycloak here; discovery and keys are fetched
    /// lazily on the first token.
    pub fn from_settings(settings: Settings) -> reqwest::Result<Self> {
        let client = http_client(settings.keycloak_verify_ssl)?;
        let jwks = JwksManager::new(settings.oidc_config_url(), client)
            .with_cache_ttl(settings.jwks_cache_ttl);
        let verifier = KeycloakTokenVerifier::new(settings.issuer_url(), settings.audience(), jwks.clone());
        let auth = AuthService::new(Arc::new(verifier), settings.auth_policy.clone());

        tracing::info!(
            issuer = %settings.issuer_url(),
            audience = settings.audience().as_deref().unwrap_or("-"),
            policy = %settings.auth_policy,
            "keycloak authentication configured"
        );

        Ok(Self::new(settings, auth).with_jwks(jwks))
    }
}
