// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication + authorization facade.
//!
//! `authenticate` and `authorize` are deliberately separate calls so a route
//! can authenticate once and apply its own authorization rule.

use std::sync::Arc;

use super::error::AuthError;
use super::policy::AccessPolicy;
use super::principal::Principal;
use super::verifier::TokenVerifier;

#[derive(Clone)]
pub struct AuthService {
    verifier: Arc<dyn TokenVerifier>,
    policy: AccessPolicy,
}

impl AuthService {
    pub fn new(verifier: Arc<dyn TokenVerifier>, policy: AccessPolicy) -> Self {
        Self { verifier, policy }
    }

    /// Verify a raw bearer token.
    pub async fn authenticate(&self, access_token: &str) -> Result<Principal, AuthError> {
        self.verifier.verify(access_token).await
    }

    /// Apply the configured access policy.
    pub fn authorize(&self, principal: &Principal) -> Result<(), AuthError> {
        self.policy.authorize(principal)
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }
}
