// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::middleware::authenticate,
    config::Settings,
    models::{
        BrowserControlAction, BrowserControlEvent, BrowserControlRequest, BrowserControlResponse,
        ConnectedEvent, Project, ProjectCreateRequest, ProjectListResponse, UserMeResponse,
    },
    state::AppState,
};

pub mod browser_control;
pub mod health;
pub mod projects;
pub mod users;

pub fn router(state: AppState) -> Router {
    let settings = state.settings.clone();

    // Every route here requires a valid bearer token.
    let protected = Router::new()
        .route("/me", get(users::get_current_user))
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/browser-control/actions",
            post(browser_control::dispatch_action),
        )
        .route(
            "/browser-control/events",
            get(browser_control::stream_events),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let api = if settings.api_prefix.is_empty() {
        protected
    } else {
        Router::new().nest(&settings.api_prefix, protected)
    };

    let mut openapi = ApiDoc::openapi().nest(&settings.api_prefix, ProtectedApi::openapi());
    openapi.info.title = settings.app_name.clone();

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&settings))
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let Some(origins) = settings.cors_origins() else {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health::health, health::readiness),
    components(
        schemas(
            UserMeResponse,
            Project,
            ProjectCreateRequest,
            ProjectListResponse,
            BrowserControlAction,
            BrowserControlRequest,
            BrowserControlResponse,
            BrowserControlEvent,
            ConnectedEvent,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "Current user identity"),
        (name = "Projects", description = "Per-user projects"),
        (name = "Browser Control", description = "Actions pushed to the browser extension")
    )
)]
struct ApiDoc;

/// Routes mounted under `API_PREFIX`; nested into [`ApiDoc`] at runtime.
#[derive(OpenApi)]
#[openapi(paths(
    users::get_current_user,
    projects::list_projects,
    projects::create_project,
    browser_control::stream_events,
    browser_control::dispatch_action
))]
struct ProtectedApi;
