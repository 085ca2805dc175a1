// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors and their HTTP mapping.
//!
//! Every failure in the auth pipeline collapses into one of three kinds.
//! Handlers and extractors return [`AuthError`] unchanged; the conversion to
//! a transport response happens only in [`IntoResponse`].
//!
//! | Kind | Status |
//! |------|--------|
//! | `Unauthorized` | 401 |
//! | `Forbidden` | 403 |
//! | `IdentityProviderUnavailable` | 503 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Missing, malformed, expired or unverifiable credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated, but the access policy denied the request.
    #[error("{0}")]
    Forbidden(String),
    /// Discovery document or JWKS could not be fetched or parsed.
    #[error("{0}")]
    IdentityProviderUnavailable(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    detail: String,
    error_code: &'static str,
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AuthError::Forbidden(message.into())
    }

    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        AuthError::IdentityProviderUnavailable(message.into())
    }

    /// The bearer header is absent or does not use the `Bearer` scheme.
    pub fn missing_credentials() -> Self {
        Self::unauthorized("Authorization bearer token is required.")
    }

    /// Any decode, signature or claim validation failure.
    pub fn invalid_token() -> Self {
        Self::unauthorized("Invalid or expired access token.")
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthorized(_) => "unauthorized",
            AuthError::Forbidden(_) => "forbidden",
            AuthError::IdentityProviderUnavailable(_) => "identity_provider_unavailable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::IdentityProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error_code: self.error_code(),
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}
