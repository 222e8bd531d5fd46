// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Project reference: the git repository a task or objective targets.

use crate::ids::ProjectId;
use serde::{Deserialize, Serialize};

/// A reference to the project (git repository) an objective or task targets.
///
/// The clone URL may be rewritten with an authenticated form once the
/// github token has been decrypted inside the owning worker (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: ProjectId,
    pub name: String,
    pub github_owner: String,
    pub github_repo: String,
    pub clone_url: String,
    pub default_branch: String,
}

impl ProjectRef {
    /// Returns the clone URL with an embedded `x-access-token` credential,
    /// the conventional form GitHub accepts for token auth over HTTPS.
    pub fn authenticated_clone_url(&self, github_token: &str) -> String {
        match self.clone_url.strip_prefix("https://") {
            Some(rest) => format!("https://x-access-token:{github_token}@{rest}"),
            None => self.clone_url.clone(),
        }
    }
}

crate::builder! {
    pub struct ProjectRefBuilder => ProjectRef {
        into {
            name: String = "demo-project",
            github_owner: String = "acme",
            github_repo: String = "demo-project",
            clone_url: String = "https://github.com/acme/demo-project.git",
            default_branch: String = "main",
        }
        computed {
            id: ProjectId = ProjectId::new(),
        }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
