// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied to the protected API router so every route under it is
//! authenticated before the handler runs. Handlers still pick their own
//! authorization through the [`Auth`](super::Auth) or
//! [`Authorized`](super::Authorized) extractors, which reuse the principal
//! stored in the request extensions.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::bearer_token;
use crate::state::AppState;

/// Verify the bearer token and stash the resulting principal.
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token.to_owned(),
        Err(err) => return err.into_response(),
    };

    match state.auth.authenticate(&token).await {
        Ok(principal) => {
            tracing::debug!(subject = principal.subject(), "request authenticated");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "request rejected");
            err.into_response()
        }
    }
}
