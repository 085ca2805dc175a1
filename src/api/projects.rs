// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    auth::Authorized,
    models::{Project, ProjectCreateRequest, ProjectListResponse},
    state::AppState,
    store::ProjectError,
};

impl IntoResponse for ProjectError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// List the caller's projects, newest first.
#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Projects owned by the caller", body = ProjectListResponse),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 403, description = "Access policy denied the user")
    )
)]
pub async fn list_projects(
    State(state): State<AppState>,
    Authorized(principal): Authorized,
) -> Json<ProjectListResponse> {
    let store = state.store.read().await;
    Json(ProjectListResponse {
        items: store.list_projects(principal.subject()),
    })
}

/// Create a project owned by the caller.
#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    security(("bearer" = [])),
    request_body = ProjectCreateRequest,
    responses(
        (status = 200, description = "Created project", body = Project),
        (status = 400, description = "Invalid name or description"),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 403, description = "Access policy denied the user")
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    Authorized(principal): Authorized,
    Json(request): Json<ProjectCreateRequest>,
) -> Result<Json<Project>, ProjectError> {
    let mut store = state.store.write().await;
    let project = store.create_project(principal.subject(), request)?;
    tracing::info!(owner = principal.subject(), project_id = %project.id, "project created");
    Ok(Json(project))
}
