// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! In-memory fakes for the external-collaborator traits, gated behind
//! `test-support` the same way `hqw-core::test_support` is, so downstream
//! crates (`hqw-worker`, `hqw-hq`, the workspace `tests/` crate) can drive
//! the Ralph Loop and scheduler deterministically without a real LLM
//! provider, tool sandbox, or git checkout.

use crate::llm::{ChatRequest, ChatResponse, LlmClient, LlmError};
use crate::tool_executor::{ToolExecution, ToolExecutor};
use crate::worktree::{WorktreeError, WorktreeHandle, WorktreeManager, WorktreeStatus};
use async_trait::async_trait;
use hqw_core::ObjectiveId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// A scripted LLM client: pops one canned response/error per `chat` call.
/// Panics (test failure) if the script runs dry, since a test that reaches
/// that point has a mismatched iteration count.
pub struct FakeLlmClient {
    script: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeLlmClient {
    pub fn new(responses: Vec<Result<ChatResponse, LlmError>>) -> Self {
        Self { script: Mutex::new(responses.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("FakeLlmClient script exhausted"))
    }
}

/// A scripted tool executor keyed by tool name; unconfigured tool names get
/// `ToolExecution::ok(Value::Null, 0)`. Records every call it receives so
/// tests can assert ordering (spec.md §4.5 step 4: "in order").
pub struct FakeToolExecutor {
    scripted: Mutex<HashMap<String, VecDeque<ToolExecution>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeToolExecutor {
    pub fn new() -> Self {
        Self { scripted: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()) }
    }

    pub fn script(&self, tool_name: impl Into<String>, execution: ToolExecution) {
        self.scripted.lock().entry(tool_name.into()).or_default().push_back(execution);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl Default for FakeToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for FakeToolExecutor {
    async fn execute(
        &self,
        call: &crate::llm::ToolCall,
        _work_dir: &Path,
        _cancel: CancellationToken,
    ) -> ToolExecution {
        self.calls.lock().push(call.name.clone());
        let mut scripted = self.scripted.lock();
        match scripted.get_mut(&call.name).and_then(VecDeque::pop_front) {
            Some(execution) => execution,
            None => ToolExecution::ok(serde_json::Value::Null, 0),
        }
    }
}

/// An in-memory worktree manager. `create` deterministically derives a path
/// from `objective_counter` rather than a random id, since the workspace
/// run rules here forbid nondeterministic sources; callers that need
/// distinct paths per call should pass a distinct `branch_name`.
pub struct FakeWorktreeManager {
    worktrees: Mutex<HashMap<PathBuf, WorktreeHandle>>,
    dirty: Mutex<std::collections::HashSet<PathBuf>>,
    merged_branches: Mutex<std::collections::HashSet<String>>,
}

impl FakeWorktreeManager {
    pub fn new() -> Self {
        Self {
            worktrees: Mutex::new(HashMap::new()),
            dirty: Mutex::new(std::collections::HashSet::new()),
            merged_branches: Mutex::new(std::collections::HashSet::new()),
        }
    }

    pub fn mark_dirty(&self, path: &Path) {
        self.dirty.lock().insert(path.to_path_buf());
    }

    pub fn mark_merged(&self, branch_name: impl Into<String>) {
        self.merged_branches.lock().insert(branch_name.into());
    }
}

impl Default for FakeWorktreeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorktreeManager for FakeWorktreeManager {
    async fn create(
        &self,
        repo_root: &Path,
        branch_name: &str,
        _base_branch: &str,
    ) -> Result<WorktreeHandle, WorktreeError> {
        let path = repo_root.join(branch_name);
        let handle = WorktreeHandle { path: path.clone(), branch_name: branch_name.to_string() };
        self.worktrees.lock().insert(path, handle.clone());
        Ok(handle)
    }

    async fn remove(&self, path: &Path) -> Result<(), WorktreeError> {
        self.worktrees
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| WorktreeError::NotFound(path.to_path_buf()))
    }

    async fn list(&self, repo_root: &Path) -> Result<Vec<WorktreeHandle>, WorktreeError> {
        Ok(self
            .worktrees
            .lock()
            .values()
            .filter(|h| h.path.starts_with(repo_root))
            .cloned()
            .collect())
    }

    async fn status(&self, path: &Path) -> Result<WorktreeStatus, WorktreeError> {
        if !self.worktrees.lock().contains_key(path) {
            return Err(WorktreeError::NotFound(path.to_path_buf()));
        }
        Ok(if self.dirty.lock().contains(path) { WorktreeStatus::Dirty } else { WorktreeStatus::Clean })
    }

    async fn is_merged(
        &self,
        _repo_root: &Path,
        branch_name: &str,
        _base_branch: &str,
    ) -> Result<bool, WorktreeError> {
        Ok(self.merged_branches.lock().contains(branch_name))
    }
}

/// A stable, test-deterministic stand-in for "the objective this fake is
/// wired up for" when a test needs to correlate fakes with a session.
pub fn fake_objective_id() -> ObjectiveId {
    ObjectiveId::from_string("obj-fake000000000000000")
}

#[cfg(test)]
#[path = "fakes_tests.rs"]
mod tests;
