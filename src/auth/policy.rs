// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access policy for authenticated principals.
//!
//! A deployment picks one policy shape:
//!
//! - `RequiredRole` - the principal must hold a configured client role
//! - `ActiveState` - the principal must be active, where an explicit
//!   "active" role beats an explicit "inactive" role, which beats the raw
//!   `active` claim

use std::fmt;

use super::error::AuthError;
use super::principal::Principal;

/// Default role required by [`AccessPolicy::RequiredRole`].
pub const DEFAULT_REQUIRED_ROLE: &str = "active";

/// Access requirement applied after authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Principal must hold `role` (case-insensitive).
    RequiredRole { role: String },
    /// Principal must be active.
    ActiveState {
        active_role: String,
        inactive_role: String,
    },
}

impl AccessPolicy {
    pub fn required_role(role: impl AsRef<str>) -> Self {
        AccessPolicy::RequiredRole {
            role: role.as_ref().trim().to_lowercase(),
        }
    }

    pub fn active_state(active_role: impl AsRef<str>, inactive_role: impl AsRef<str>) -> Self {
        AccessPolicy::ActiveState {
            active_role: active_role.as_ref().trim().to_lowercase(),
            inactive_role: inactive_role.as_ref().trim().to_lowercase(),
        }
    }

    /// Check `principal` against this policy.
    ///
    /// A `RequiredRole` policy with an empty role denies everyone; that is a
    /// configuration mistake, but it is reported the same way as a denial.
    pub fn authorize(&self, principal: &Principal) -> Result<(), AuthError> {
        match self {
            AccessPolicy::RequiredRole { role } => {
                if role.is_empty() {
                    return Err(AuthError::forbidden(
                        "Required active role is not configured.",
                    ));
                }
                if !principal.has_role(role) {
                    return Err(AuthError::forbidden(format!(
                        "User must have '{role}' role."
                    )));
                }
                Ok(())
            }
            AccessPolicy::ActiveState {
                active_role,
                inactive_role,
            } => match principal.active_state_from_roles(active_role, inactive_role) {
                Some(true) => Ok(()),
                _ => Err(AuthError::forbidden("User account is not active.")),
            },
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::required_role(DEFAULT_REQUIRED_ROLE)
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessPolicy::RequiredRole { role } => write!(f, "required-role({role})"),
            AccessPolicy::ActiveState {
                active_role,
                inactive_role,
            } => write!(f, "active-state({active_role}/{inactive_role})"),
        }
    }
}
