// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Login Gateway - Keycloak bearer-token verification service
//!
//! Backend for the Relational browser extension. Every protected request
//! carries a Keycloak access token, which is verified against the realm's
//! published signing keys and checked against a configurable access policy.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, JWKS cache and access policy
//! - `config` - Environment-driven settings
//! - `events` - Per-user browser-control event fan-out
//! - `store` - In-memory per-user projects

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod models;
pub mod observability;
pub mod state;
pub mod store;
