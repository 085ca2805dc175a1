// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated principals.
//!
//! ```rust,ignore
//! async fn me(Authorized(principal): Authorized) -> impl IntoResponse {
//!     // principal passed both token verification and the access policy
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{AuthError, Principal};
use crate::state::AppState;

/// Pull the bearer token out of an `Authorization` header.
///
/// The scheme is matched case-insensitively. A missing header, another
/// scheme, or an empty token are all treated as missing credentials.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AuthError::missing_credentials)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(AuthError::missing_credentials)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::missing_credentials());
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::missing_credentials());
    }
    Ok(token)
}

/// Authenticated principal. No access policy is applied.
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already authenticated by middleware
        if let Some(principal) = parts.extensions.get::<Principal>().cloned() {
            return Ok(Auth(principal));
        }

        let token = bearer_token(&parts.headers)?;
        let principal = state.auth.authenticate(token).await?;
        parts.extensions.insert(principal.clone());
        Ok(Auth(principal))
    }
}

/// Authenticated principal that also satisfies the configured access policy.
pub struct Authorized(pub Principal);

impl FromRequestParts<AppState> for Authorized {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(principal) = Auth::from_request_parts(parts, state).await?;
        state.auth.authorize(&principal)?;
        Ok(Authorized(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use axum::http::Request;
    use std::collections::BTreeSet;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/me");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let parts = parts_with_auth(Some("bEaReR   abc.def.ghi "));
        assert_eq!(bearer_token(&parts.headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_or_foreign_credentials() {
        for value in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer"), Some("Bearer    "), Some("token")] {
            let parts = parts_with_auth(value);
            assert_eq!(
                bearer_token(&parts.headers).unwrap_err(),
                AuthError::missing_credentials(),
                "header {value:?}"
            );
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_header() {
        let state = test_state();
        let mut parts = parts_with_auth(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn auth_extractor_verifies_token() {
        let state = test_state();
        let mut parts = parts_with_auth(Some("Bearer token-alice:active"));

        let Auth(principal) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(principal.subject(), "alice");
        assert!(parts.extensions.get::<Principal>().is_some());
    }

    #[tokio::test]
    async fn auth_extractor_prefers_middleware_principal() {
        let state = test_state();
        let mut parts = parts_with_auth(None);
        let principal =
            Principal::new("from-middleware", None, BTreeSet::new(), BTreeSet::new(), None).unwrap();
        parts.extensions.insert(principal);

        let Auth(principal) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(principal.subject(), "from-middleware");
    }

    #[tokio::test]
    async fn authorized_extractor_applies_policy() {
        let state = test_state();

        let mut parts = parts_with_auth(Some("Bearer token-alice:active"));
        assert!(Authorized::from_request_parts(&mut parts, &state).await.is_ok());

        let mut parts = parts_with_auth(Some("Bearer token-bob:editor"));
        let result = Authorized::from_request_parts(&mut parts, &state).await;
        assert_eq!(
            result.err(),
            Some(AuthError::forbidden("User must have 'active' role."))
        );
    }
}
