// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings are read from the environment once at startup (a `.env` file is
//! loaded first by the binary if present).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APP_NAME` | Service name (OpenAPI title) | `Login API` |
//! | `API_PREFIX` | Prefix for protected routes | `/api` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `KEYCLOAK_BASE_URL` | Keycloak root URL | `http://localhost:8080` |
//! | `KEYCLOAK_REALM` | Realm name | `test` |
//! | `KEYCLOAK_EXPECTED_AUDIENCE` | Required `aud` value, empty to skip | empty |
//! | `KEYCLOAK_VERIFY_SSL` | Verify Keycloak TLS certificates | `false` |
//! | `KEYCLOAK_JWKS_CACHE_TTL_SECONDS` | JWKS cache lifetime (min 30) | `300` |
//! | `AUTH_POLICY` | `required-role` or `active-state` | `required-role` |
//! | `AUTH_REQUIRED_ROLE` | Role for the `required-role` policy | `active` |
//! | `AUTH_ACTIVE_ROLE_TRUE` | Role forcing active (`active-state`) | `active` |
//! | `AUTH_ACTIVE_ROLE_FALSE` | Role forcing inactive (`active-state`) | `inactive` |
//! | `CORS_ALLOW_ORIGINS` | `*` or comma-separated origins | `*` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::auth::AccessPolicy;

pub const APP_NAME_ENV: &str = "APP_NAME";
pub const API_PREFIX_ENV: &str = "API_PREFIX";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const KEYCLOAK_BASE_URL_ENV: &str = "KEYCLOAK_BASE_URL";
pub const KEYCLOAK_REALM_ENV: &str = "KEYCLOAK_REALM";
pub const KEYCLOAK_EXPECTED_AUDIENCE_ENV: &str = "KEYCLOAK_EXPECTED_AUDIENCE";
pub const KEYCLOAK_VERIFY_SSL_ENV: &str = "KEYCLOAK_VERIFY_SSL";
pub const KEYCLOAK_JWKS_CACHE_TTL_ENV: &str = "KEYCLOAK_JWKS_CACHE_TTL_SECONDS";
pub const AUTH_POLICY_ENV: &str = "AUTH_POLICY";
pub const AUTH_REQUIRED_ROLE_ENV: &str = "AUTH_REQUIRED_ROLE";
pub const AUTH_ACTIVE_ROLE_TRUE_ENV: &str = "AUTH_ACTIVE_ROLE_TRUE";
pub const AUTH_ACTIVE_ROLE_FALSE_ENV: &str = "AUTH_ACTIVE_ROLE_FALSE";
pub const CORS_ALLOW_ORIGINS_ENV: &str = "CORS_ALLOW_ORIGINS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_APP_NAME: &str = "Login API";
const DEFAULT_API_PREFIX: &str = "/api";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_KEYCLOAK_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_KEYCLOAK_REALM: &str = "test";
const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;
const MIN_JWKS_CACHE_TTL_SECONDS: u64 = 30;

/// Invalid environment value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl ConfigError {
    fn new(var: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            var,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected `json` or `pretty`".to_string()),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    /// Always starts with `/` and never ends with one (empty means root).
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    /// Without trailing slash.
    pub keycloak_base_url: String,
    pub keycloak_realm: String,
    pub keycloak_expected_audience: String,
    pub keycloak_verify_ssl: bool,
    pub jwks_cache_ttl: Duration,
    pub auth_policy: AccessPolicy,
    pub cors_allow_origins: String,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_prefix = normalize_prefix(&get(API_PREFIX_ENV, DEFAULT_API_PREFIX));

        let port = match lookup(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::new(PORT_ENV, raw.clone(), e.to_string()))?,
            None => DEFAULT_PORT,
        };

        let raw_base = get(KEYCLOAK_BASE_URL_ENV, DEFAULT_KEYCLOAK_BASE_URL);
        let keycloak_base_url = raw_base.trim().trim_end_matches('/').to_string();
        Url::parse(&keycloak_base_url)
            .map_err(|e| ConfigError::new(KEYCLOAK_BASE_URL_ENV, raw_base.clone(), e.to_string()))?;

        let keycloak_realm = get(KEYCLOAK_REALM_ENV, DEFAULT_KEYCLOAK_REALM).trim().to_string();
        if keycloak_realm.is_empty() {
            return Err(ConfigError::new(KEYCLOAK_REALM_ENV, keycloak_realm, "must not be empty"));
        }

        let keycloak_verify_ssl = match lookup(KEYCLOAK_VERIFY_SSL_ENV) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::new(KEYCLOAK_VERIFY_SSL_ENV, raw.clone(), "expected a boolean")
            })?,
            None => false,
        };

        let ttl_seconds = match lookup(KEYCLOAK_JWKS_CACHE_TTL_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::new(KEYCLOAK_JWKS_CACHE_TTL_ENV, raw.clone(), e.to_string()))?,
            None => DEFAULT_JWKS_CACHE_TTL_SECONDS,
        };
        if ttl_seconds < MIN_JWKS_CACHE_TTL_SECONDS {
            return Err(ConfigError::new(
                KEYCLOAK_JWKS_CACHE_TTL_ENV,
                ttl_seconds.to_string(),
                format!("must be at least {MIN_JWKS_CACHE_TTL_SECONDS}"),
            ));
        }

        let auth_policy = match get(AUTH_POLICY_ENV, "required-role").trim().to_ascii_lowercase().as_str() {
            "required-role" => AccessPolicy::required_role(get(AUTH_REQUIRED_ROLE_ENV, "active")),
            "active-state" => AccessPolicy::active_state(
                get(AUTH_ACTIVE_ROLE_TRUE_ENV, "active"),
                get(AUTH_ACTIVE_ROLE_FALSE_ENV, "inactive"),
            ),
            other => {
                return Err(ConfigError::new(
                    AUTH_POLICY_ENV,
                    other,
                    "expected `required-role` or `active-state`",
                ))
            }
        };

        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|reason| ConfigError::new(LOG_FORMAT_ENV, raw.clone(), reason))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            app_name: get(APP_NAME_ENV, DEFAULT_APP_NAME),
            api_prefix,
            host: get(HOST_ENV, DEFAULT_HOST),
            port,
            keycloak_base_url,
            keycloak_realm,
            keycloak_expected_audience: get(KEYCLOAK_EXPECTED_AUDIENCE_ENV, ""),
            keycloak_verify_ssl,
            jwks_cache_ttl: Duration::from_secs(ttl_seconds),
            auth_policy,
            cors_allow_origins: get(CORS_ALLOW_ORIGINS_ENV, "*"),
            log_format,
        })
    }

    /// Expected `iss` claim.
    pub fn issuer_url(&self) -> String {
        format!("{}/realms/{}", self.keycloak_base_url, self.keycloak_realm)
    }

    pub fn oidc_config_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.issuer_url())
    }

    /// Expected `aud` claim, `None` when audience checks are disabled.
    pub fn audience(&self) -> Option<String> {
        let audience = self.keycloak_expected_audience.trim();
        (!audience.is_empty()).then(|| audience.to_string())
    }

    /// Allowed CORS origins, `None` meaning any origin.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_allow_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::new(HOST_ENV, self.host.clone(), "not a valid bind address"))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            keycloak_base_url: DEFAULT_KEYCLOAK_BASE_URL.to_string(),
            keycloak_realm: DEFAULT_KEYCLOAK_REALM.to_string(),
            keycloak_expected_audience: String::new(),
            keycloak_verify_ssl: false,
            jwks_cache_ttl: Duration::from_secs(DEFAULT_JWKS_CACHE_TTL_SECONDS),
            auth_policy: AccessPolicy::default(),
            cors_allow_origins: "*".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
