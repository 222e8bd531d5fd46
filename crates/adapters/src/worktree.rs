// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The git-worktree toolchain collaborator (spec.md §1 Non-goals: "the
//! git-worktree toolchain, assumed to provide
//! `create/remove/list/status/isMerged`").
//!
//! HQ's dependency-driven auto-start (spec.md §4.7, §8 S6) inherits a
//! predecessor task's worktree rather than creating a fresh one, so the
//! trait exposes enough of the toolchain's surface for both the
//! originating `create` and the inheriting `StartTaskWithInheritance` path
//! to be expressed without HQ shelling out to `git` itself.

use async_trait::async_trait;
use std::path::PathBuf;

/// A created working copy: a path on disk plus the branch checked out there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeHandle {
    pub path: PathBuf,
    pub branch_name: String,
}

/// Whether a worktree's branch has uncommitted changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeStatus {
    Clean,
    Dirty,
}

#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    #[error("worktree at {0} not found")]
    NotFound(PathBuf),
    #[error("worktree toolchain error: {0}")]
    Toolchain(String),
}

/// The narrow interface the core depends on. The real implementation shells
/// out to `git worktree` against a clone of `Objective::project`/
/// `Task::project_id` (spec.md §1 Non-goals).
#[async_trait]
pub trait WorktreeManager: Send + Sync {
    /// Create a new worktree for `branch_name`, branching from `base_branch`.
    async fn create(
        &self,
        repo_root: &std::path::Path,
        branch_name: &str,
        base_branch: &str,
    ) -> Result<WorktreeHandle, WorktreeError>;

    /// Remove a previously created worktree. Best-effort: callers treat
    /// failure as non-fatal cleanup (spec.md §4.6: "best-effort cleanup of
    /// work_dir only on `completed`").
    async fn remove(&self, path: &std::path::Path) -> Result<(), WorktreeError>;

    async fn list(&self, repo_root: &std::path::Path) -> Result<Vec<WorktreeHandle>, WorktreeError>;

    async fn status(&self, path: &std::path::Path) -> Result<WorktreeStatus, WorktreeError>;

    /// True if `branch_name`'s changes are already merged into `base_branch`.
    async fn is_merged(&self, repo_root: &std::path::Path, branch_name: &str, base_branch: &str)
        -> Result<bool, WorktreeError>;
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
