// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keycloak access-token claims.
//!
//! Tokens are decoded into a raw JSON object first and then read field by
//! field. A claim that is absent or has an unexpected type is treated as
//! empty, never as an error; the only claim whose absence fails verification
//! is `sub`.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::error::AuthError;
use super::principal::Principal;

/// Claim extraction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error("Token is missing subject.")]
    MissingSubject,
}

impl From<ClaimError> for AuthError {
    fn from(err: ClaimError) -> Self {
        AuthError::unauthorized(err.to_string())
    }
}

/// Claims read from a verified Keycloak access token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeycloakClaims {
    /// `sub`, only kept when it is a non-empty string
    pub subject: Option<String>,
    /// `preferred_username`
    pub preferred_username: Option<String>,
    /// `azp` (authorized party / client id)
    pub authorized_party: Option<String>,
    /// `groups`, string entries only
    pub groups: BTreeSet<String>,
    /// `resource_access`, keyed by client id
    pub resource_access: BTreeMap<String, ClientAccess>,
    /// `active`, normalised from a boolean or boolean-like string
    pub active: Option<bool>,
}

/// One `resource_access.<client>` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientAccess {
    /// `None` when a `roles` field is present but is not a list.
    pub roles: Option<BTreeSet<String>>,
}

impl KeycloakClaims {
    /// Read claims from a decoded token payload.
    pub fn from_value(payload: &Value) -> Self {
        let Some(claims) = payload.as_object() else {
            return Self::default();
        };

        Self {
            subject: string_claim(claims, "sub").filter(|sub| !sub.is_empty()),
            preferred_username: string_claim(claims, "preferred_username"),
            authorized_party: string_claim(claims, "azp"),
            groups: claims.get("groups").map(string_set).unwrap_or_default(),
            resource_access: claims
                .get("resource_access")
                .map(parse_resource_access)
                .unwrap_or_default(),
            active: claims.get("active").and_then(parse_active),
        }
    }

    pub fn subject(&self) -> Result<&str, ClaimError> {
        self.subject.as_deref().ok_or(ClaimError::MissingSubject)
    }

    /// Client roles for the caller.
    ///
    /// When `azp` names a client with a role list, only that client's roles
    /// are returned. Otherwise the role lists of every client are merged.
    pub fn roles(&self) -> BTreeSet<String> {
        if let Some(azp) = &self.authorized_party {
            if let Some(roles) = self
                .resource_access
                .get(azp)
                .and_then(|access| access.roles.as_ref())
            {
                return roles.clone();
            }
        }

        self.resource_access
            .values()
            .filter_map(|access| access.roles.as_ref())
            .flatten()
            .cloned()
            .collect()
    }

    /// Build the principal for these claims.
    pub fn into_principal(self) -> Result<Principal, AuthError> {
        let subject = self.subject()?.to_string();
        let roles = self.roles();
        Principal::new(
            subject,
            self.preferred_username,
            self.groups,
            roles,
            self.active,
        )
    }
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims.get(name).and_then(Value::as_str).map(str::to_string)
}

fn string_set(value: &Value) -> BTreeSet<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_resource_access(value: &Value) -> BTreeMap<String, ClientAccess> {
    let Some(clients) = value.as_object() else {
        return BTreeMap::new();
    };

    clients
        .iter()
        .filter_map(|(client, access)| {
            let access = access.as_object()?;
            let roles = match access.get("roles") {
                None => Some(BTreeSet::new()),
                Some(roles) if roles.is_array() => Some(string_set(roles)),
                Some(_) => None,
            };
            Some((client.clone(), ClientAccess { roles }))
        })
        .collect()
}

/// Interpret the `active` claim.
///
/// Booleans are taken verbatim. Strings are matched case-insensitively
/// against `true`/`1`/`yes` and `false`/`0`/`no`; anything else is absent.
pub fn parse_active(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(active) => Some(*active),
        Value::String(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
