// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;

use crate::auth::Authorized;
use crate::models::UserMeResponse;

/// Get the current authenticated user's identity.
///
/// Returns the subject, username, groups and client roles taken from the
/// verified access token.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 403, description = "Access policy denied the user"),
        (status = 503, description = "Identity provider unavailable"),
    )
)]
pub async fn get_current_user(Authorized(principal): Authorized) -> Json<UserMeResponse> {
    Json(UserMeResponse::from(&principal))
}
