// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! A concrete [`WorktreeManager`] that shells out to `git worktree`
//! (spec.md §1 Non-goals: "reimplementing git" is out of scope, but the
//! worker binary still needs a real implementation of the toolchain
//! interface the core assumes, not just the fakes tests use).

use crate::worktree::{WorktreeError, WorktreeHandle, WorktreeManager, WorktreeStatus};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub struct GitWorktreeManager;

impl GitWorktreeManager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GitWorktreeManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_git(repo_root: &Path, args: &[&str]) -> Result<String, WorktreeError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .await
        .map_err(|e| WorktreeError::Toolchain(e.to_string()))?;
    if !output.status.success() {
        return Err(WorktreeError::Toolchain(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[async_trait]
impl WorktreeManager for GitWorktreeManager {
    async fn create(
        &self,
        repo_root: &Path,
        branch_name: &str,
        base_branch: &str,
    ) -> Result<WorktreeHandle, WorktreeError> {
        let path = repo_root.join(".worktrees").join(branch_name.replace('/', "-"));
        let path_str = path.to_string_lossy().to_string();
        run_git(repo_root, &["worktree", "add", "-b", branch_name, &path_str, base_branch]).await?;
        Ok(WorktreeHandle { path, branch_name: branch_name.to_string() })
    }

    async fn remove(&self, path: &Path) -> Result<(), WorktreeError> {
        let repo_root = path.parent().and_then(Path::parent).ok_or_else(|| WorktreeError::NotFound(path.to_path_buf()))?;
        run_git(repo_root, &["worktree", "remove", "--force", &path.to_string_lossy()]).await?;
        Ok(())
    }

    async fn list(&self, repo_root: &Path) -> Result<Vec<WorktreeHandle>, WorktreeError> {
        let output = run_git(repo_root, &["worktree", "list", "--porcelain"]).await?;
        Ok(parse_worktree_list(&output))
    }

    async fn status(&self, path: &Path) -> Result<WorktreeStatus, WorktreeError> {
        let output = run_git(path, &["status", "--porcelain"]).await?;
        Ok(if output.trim().is_empty() { WorktreeStatus::Clean } else { WorktreeStatus::Dirty })
    }

    async fn is_merged(&self, repo_root: &Path, branch_name: &str, base_branch: &str) -> Result<bool, WorktreeError> {
        let output = Command::new("git")
            .args(["merge-base", "--is-ancestor", branch_name, base_branch])
            .current_dir(repo_root)
            .output()
            .await
            .map_err(|e| WorktreeError::Toolchain(e.to_string()))?;
        Ok(output.status.success())
    }
}

fn parse_worktree_list(porcelain: &str) -> Vec<WorktreeHandle> {
    let mut handles = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut branch: Option<String> = None;
    for line in porcelain.lines() {
        if let Some(rest) = line.strip_prefix("worktree ") {
            if let (Some(p), Some(b)) = (path.take(), branch.take()) {
                handles.push(WorktreeHandle { path: p, branch_name: b });
            }
            path = Some(PathBuf::from(rest));
        } else if let Some(rest) = line.strip_prefix("branch ") {
            branch = Some(rest.trim_start_matches("refs/heads/").to_string());
        } else if line.is_empty() {
            if let (Some(p), Some(b)) = (path.take(), branch.take()) {
                handles.push(WorktreeHandle { path: p, branch_name: b });
            }
        }
    }
    if let (Some(p), Some(b)) = (path, branch) {
        handles.push(WorktreeHandle { path: p, branch_name: b });
    }
    handles
}

#[cfg(test)]
#[path = "git_worktree_tests.rs"]
mod tests;
