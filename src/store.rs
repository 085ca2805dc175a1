// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory project store.
//!
//! Projects are kept per owner subject, newest first. Nothing is persisted;
//! the store lives as long as the process. Callers share it through
//! `Arc<RwLock<InMemoryStore>>` in [`AppState`](crate::state::AppState).

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{Project, ProjectCreateRequest, PROJECT_DESCRIPTION_MAX_LEN, PROJECT_NAME_MAX_LEN};

/// Validation failure when creating a project. Served as `400 {"detail": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    #[error("Project name is required.")]
    NameRequired,
    #[error("Project name must be at most {} characters.", PROJECT_NAME_MAX_LEN)]
    NameTooLong,
    #[error("Project description must be at most {} characters.", PROJECT_DESCRIPTION_MAX_LEN)]
    DescriptionTooLong,
}

#[derive(Default)]
pub struct InMemoryStore {
    projects: HashMap<String, Vec<Project>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects owned by `owner_subject`, newest first.
    pub fn list_projects(&self, owner_subject: &str) -> Vec<Project> {
        self.projects.get(owner_subject).cloned().unwrap_or_default()
    }

    /// Validate and store a new project for `owner_subject`.
    pub fn create_project(
        &mut self,
        owner_subject: &str,
        request: ProjectCreateRequest,
    ) -> Result<Project, ProjectError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ProjectError::NameRequired);
        }
        if name.chars().count() > PROJECT_NAME_MAX_LEN {
            return Err(ProjectError::NameTooLong);
        }

        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if description.is_some_and(|d| d.chars().count() > PROJECT_DESCRIPTION_MAX_LEN) {
            return Err(ProjectError::DescriptionTooLong);
        }

        let project = Project {
            id: Uuid::new_v4(),
            owner_subject: owner_subject.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        self.projects
            .entry(owner_subject.to_string())
            .or_default()
            .insert(0, project.clone());
        Ok(project)
    }
}
