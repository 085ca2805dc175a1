// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated principal representation.

use std::collections::BTreeSet;

use super::error::AuthError;

/// Verified identity of the caller.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request. A `Principal` can only be built
/// with a non-empty subject; all other attributes are optional or may be empty.
///
/// Role and group lookups are case-insensitive and ignore surrounding whitespace,
/// and so is equality between principals. Names are kept as issued.
#[derive(Debug, Clone)]
pub struct Principal {
    subject: String,
    username: Option<String>,
    groups: BTreeSet<String>,
    roles: BTreeSet<String>,
    active_claim: Option<bool>,
}

impl Principal {
    /// Build a principal, rejecting an empty subject.
    pub fn new(
        subject: impl Into<String>,
        username: Option<String>,
        groups: BTreeSet<String>,
        roles: BTreeSet<String>,
        active_claim: Option<bool>,
    ) -> Result<Self, AuthError> {
        let subject = subject.into();
        if subject.is_empty() {
            return Err(AuthError::unauthorized("Token is missing subject."));
        }

        Ok(Self {
            subject,
            username,
            groups,
            roles,
            active_claim,
        })
    }

    /// Canonical identity key (`sub` claim).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Display name (`preferred_username` claim).
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Raw upstream `active` signal.
    pub fn active_claim(&self) -> Option<bool> {
        self.active_claim
    }

    /// Check whether the principal holds `expected_role`.
    ///
    /// An empty or blank role never matches.
    pub fn has_role(&self, expected_role: &str) -> bool {
        let target = normalize(expected_role);
        if target.is_empty() {
            return false;
        }
        self.roles.iter().any(|role| normalize(role) == target)
    }

    /// Check group membership by path suffix.
    ///
    /// `"admins"` and `"/admins"` both match `"/admins"` and `"/team/admins"`,
    /// but not `"/team/superadmins"`.
    pub fn in_group(&self, expected_group: &str) -> bool {
        let target = normalize(expected_group);
        let target = target.trim_start_matches('/');
        if target.is_empty() {
            return false;
        }

        let suffix = format!("/{target}");
        self.groups.iter().any(|group| {
            let candidate = normalize(group);
            let candidate = candidate.trim_start_matches('/');
            candidate == target || candidate.ends_with(&suffix)
        })
    }

    /// Derive the active state.
    ///
    /// The `true` role wins over the `false` role, which wins over the raw
    /// `active` claim.
    pub fn active_state_from_roles(
        &self,
        active_role_true: &str,
        active_role_false: &str,
    ) -> Option<bool> {
        if self.has_role(active_role_true) {
            return Some(true);
        }
        if self.has_role(active_role_false) {
            return Some(false);
        }
        self.active_claim
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
            && self.username == other.username
            && self.active_claim == other.active_claim
            && normalize_all(&self.roles) == normalize_all(&other.roles)
            && normalize_all(&self.groups) == normalize_all(&other.groups)
    }
}

impl Eq for Principal {}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_all(values: &BTreeSet<String>) -> BTreeSet<String> {
    values.iter().map(|value| normalize(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn principal(groups: &[&str], roles: &[&str], active: Option<bool>) -> Principal {
        Principal::new("user-123", Some("alice".into()), set(groups), set(roles), active)
            .expect("valid principal")
    }

    #[test]
    fn empty_subject_is_rejected() {
        let err = Principal::new("", None, BTreeSet::new(), BTreeSet::new(), None)
            .expect_err("empty subject");
        assert_eq!(err, AuthError::unauthorized("Token is missing subject."));
    }

    #[test]
    fn accessors_return_constructed_values() {
        let p = principal(&["/team"], &["editor"], Some(true));
        assert_eq!(p.subject(), "user-123");
        assert_eq!(p.username(), Some("alice"));
        assert_eq!(p.groups(), &set(&["/team"]));
        assert_eq!(p.roles(), &set(&["editor"]));
        assert_eq!(p.active_claim(), Some(true));
    }

    #[test]
    fn equality_ignores_role_and_group_case() {
        let upper = principal(&["/Team"], &["Active"], Some(true));
        let lower = principal(&["/team"], &["active"], Some(true));
        assert_eq!(upper, lower);
        assert_eq!(upper.roles(), &set(&["Active"]));

        assert_ne!(upper, principal(&["/team"], &["editor"], Some(true)));
        assert_ne!(upper, principal(&["/Team"], &["Active"], None));
    }

    #[test]
    fn has_role_is_case_insensitive() {
        let p = principal(&[], &["active", "Editor"], None);
        assert!(p.has_role("Active"));
        assert!(p.has_role(" editor "));
        assert!(!p.has_role("admin"));
        assert!(!p.has_role("   "));
    }

    #[test]
    fn in_group_matches_path_suffix() {
        let p = principal(&["/team/Admins", "ops"], &[], None);
        assert!(p.in_group("admins"));
        assert!(p.in_group("/ADMINS"));
        assert!(p.in_group("team/admins"));
        assert!(p.in_group("/ops"));
        assert!(!p.in_group("mins"));
        assert!(!p.in_group("/"));
        assert!(!p.in_group(""));
    }

    #[test]
    fn active_state_prefers_true_role_then_false_role_then_claim() {
        let both = principal(&[], &["active", "inactive"], Some(false));
        assert_eq!(both.active_state_from_roles("active", "inactive"), Some(true));

        let only_false = principal(&[], &["INACTIVE"], Some(true));
        assert_eq!(
            only_false.active_state_from_roles("active", "inactive"),
            Some(false)
        );

        let claim_only = principal(&[], &[], Some(true));
        assert_eq!(
            claim_only.active_state_from_roles("active", "inactive"),
            Some(true)
        );

        let nothing = principal(&[], &[], None);
        assert_eq!(nothing.active_state_from_roles("active", "inactive"), None);
    }
}
