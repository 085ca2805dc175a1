// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Browser-control channel.
//!
//! The extension keeps an SSE connection open on `/browser-control/events`;
//! any authorized session of the same user can push an action through
//! `/browser-control/actions`, and it is delivered to that user's streams only.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tokio_stream::StreamExt;

use crate::{
    auth::Authorized,
    models::{BrowserControlEvent, BrowserControlRequest, BrowserControlResponse, ConnectedEvent},
    state::AppState,
};

/// Interval between SSE keep-alive comments.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(20);

pub const CONNECTED_EVENT: &str = "connected";
pub const CONTROL_ACTION_EVENT: &str = "control-action";

fn sse_event(name: &'static str, payload: &impl Serialize) -> SseEvent {
    let data = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    SseEvent::default().event(name).data(data)
}

/// Stream browser-control events for the caller.
///
/// Emits a `connected` event first, then one `control-action` event per
/// dispatched action. Keep-alive comments are sent every 20 seconds.
#[utoipa::path(
    get,
    path = "/browser-control/events",
    tag = "Browser Control",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Server-sent event stream", body = String, content_type = "text/event-stream"),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 403, description = "Access policy denied the user")
    )
)]
pub async fn stream_events(
    State(state): State<AppState>,
    Authorized(principal): Authorized,
) -> impl IntoResponse {
    let subscription = state.events.subscribe(principal.subject());

    let connected = sse_event(
        CONNECTED_EVENT,
        &ConnectedEvent {
            connected_at: Utc::now(),
        },
    );
    let stream = tokio_stream::once(connected)
        .chain(subscription.map(|event: BrowserControlEvent| sse_event(CONTROL_ACTION_EVENT, &event)))
        .map(Ok::<_, Infallible>);

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keepalive"),
    );

    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no")),
        ],
        sse,
    )
}

/// Dispatch an action to every open event stream of the caller.
#[utoipa::path(
    post,
    path = "/browser-control/actions",
    tag = "Browser Control",
    security(("bearer" = [])),
    request_body = BrowserControlRequest,
    responses(
        (status = 200, description = "Action dispatched", body = BrowserControlResponse),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 403, description = "Access policy denied the user")
    )
)]
pub async fn dispatch_action(
    State(state): State<AppState>,
    Authorized(principal): Authorized,
    Json(request): Json<BrowserControlRequest>,
) -> Json<BrowserControlResponse> {
    let event = BrowserControlEvent::new(&principal, request.action);
    let response = BrowserControlResponse {
        ok: true,
        action: event.action,
        dispatched_at: event.created_at,
    };

    let delivered = state.events.publish(event);
    tracing::debug!(
        owner = principal.subject(),
        action = %request.action,
        delivered,
        "browser-control action dispatched"
    );

    Json(response)
}
