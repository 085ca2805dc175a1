// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response data structures used by the REST API. All types
//! derive `Serialize`/`Deserialize` and `ToSchema` for JSON handling and
//! OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Users**: the caller's identity as seen by the gateway
//! - **Projects**: per-user resources
//! - **Browser control**: actions pushed to the caller's extension sessions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Principal;

/// Maximum project name length (characters, after trimming).
pub const PROJECT_NAME_MAX_LEN: usize = 120;
/// Maximum project description length (characters, after trimming).
pub const PROJECT_DESCRIPTION_MAX_LEN: usize = 500;

// =============================================================================
// User Models
// =============================================================================

/// Response for `GET {prefix}/me`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserMeResponse {
    /// Keycloak subject (`sub`).
    pub subject: String,
    pub username: Option<String>,
    pub groups: Vec<String>,
    /// Client roles; case-insensitive for lookups, values kept as issued.
    pub roles: Vec<String>,
    /// Raw `active` claim if the token carried one.
    pub active: Option<bool>,
}

impl From<&Principal> for UserMeResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            subject: principal.subject().to_string(),
            username: principal.username().map(str::to_string),
            groups: principal.groups().iter().cloned().collect(),
            roles: principal.roles().iter().cloned().collect(),
            active: principal.active_claim(),
        }
    }
}

// =============================================================================
// Project Models
// =============================================================================

/// A project owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Project {
    pub id: Uuid,
    /// Subject of the owning user.
    pub owner_subject: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    /// 1-120 characters after trimming.
    pub name: String,
    /// Up to 500 characters; blank is stored as `null`.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectListResponse {
    pub items: Vec<Project>,
}

// =============================================================================
// Browser Control Models
// =============================================================================

/// Action the extension should perform in the user's browser.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BrowserControlAction {
    Click,
    Popup,
    Close,
}

impl BrowserControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserControlAction::Click => "click",
            BrowserControlAction::Popup => "popup",
            BrowserControlAction::Close => "close",
        }
    }
}

impl fmt::Display for BrowserControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BrowserControlRequest {
    pub action: BrowserControlAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BrowserControlResponse {
    pub ok: bool,
    pub action: BrowserControlAction,
    pub dispatched_at: DateTime<Utc>,
}

/// Event delivered on the `control-action` SSE channel.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BrowserControlEvent {
    /// Simple (undashed) UUID.
    pub event_id: String,
    pub owner_subject: String,
    pub action: BrowserControlAction,
    /// Username of the user who dispatched the action, if known.
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BrowserControlEvent {
    pub fn new(owner: &Principal, action: BrowserControlAction) -> Self {
        Self {
            event_id: Uuid::new_v4().simple().to_string(),
            owner_subject: owner.subject().to_string(),
            action,
            actor: owner.username().map(str::to_string),
            created_at: Utc::now(),
        }
    }
}

/// Payload of the initial `connected` SSE event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectedEvent {
    pub connected_at: DateTime<Utc>,
}
