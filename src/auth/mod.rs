// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Keycloak bearer-token authentication and access policy for the Login API.
//!
//! ## Auth Flow
//!
//! 1. The browser extension authenticates the user with Keycloak
//! 2. It sends `Authorization: Bearer <access token>`
//! 3. The gateway:
//!    - Discovers the realm's JWKS URI from its OIDC configuration
//!    - Verifies signature, expiry, not-before, issuer and (optionally) audience
//!    - Extracts `sub`, username, groups, client roles and the `active` claim
//!    - Applies the configured [`AccessPolicy`]
//!
//! ## Failure mapping
//!
//! - Missing or bad credentials: `401 unauthorized`
//! - Valid token, policy denied: `403 forbidden`
//! - Keycloak unreachable and no usable keys: `503 identity_provider_unavailable`
//!
//! JWKS keys are cached with a TTL; an unknown key id forces exactly one
//! refresh before the token is rejected. `exp` and `nbf` allow no clock skew.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod policy;
pub mod principal;
pub mod service;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::AuthError;
pub use extractor::{Auth, Authorized};
pub use jwks::JwksManager;
pub use policy::AccessPolicy;
pub use principal::Principal;
pub use service::AuthService;
pub use verifier::{KeycloakTokenVerifier, TokenVerifier};
