// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Task: a schedulable unit of work within a project, with dependency edges.

use crate::hat::Hat;
use crate::ids::{ProjectId, QuestId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lifecycle status of a task (spec.md §3, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Planning,
    Ready,
    Running,
    Paused,
    Quarantined,
    Completed,
    Cancelled,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Planning => "planning",
        Ready => "ready",
        Running => "running",
        Paused => "paused",
        Quarantined => "quarantined",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    /// A blocker in one of these statuses no longer blocks dependents
    /// (spec.md §4.7: "auto-start ready tasks" only fires once every
    /// blocker has resolved one way or the other).
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// A schedulable unit of work (spec.md §3).
///
/// Blocked-ness is never stored as a flag: a task is blocked iff any of its
/// `dependencies` is not yet terminal (spec.md §9 design note), so it can
/// only be answered relative to the current status of those dependencies,
/// which the caller supplies (the scheduler/repository owns that lookup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub quest_id: Option<QuestId>,
    pub title: String,
    pub description: String,
    pub hat: Hat,
    pub status: TaskStatus,
    /// 1 (lowest) through 5 (highest); the scheduler's priority heap orders
    /// on this value (spec.md §4.7).
    pub priority: u8,
    pub dependencies: Vec<TaskId>,
    pub base_branch: String,
    /// Set once a worktree has been created for this task, either at
    /// dispatch or via dependency-driven inheritance (spec.md §4.7, §9).
    pub worktree_path: Option<String>,
    pub branch_name: Option<String>,
    pub token_budget: u64,
    pub token_used: u64,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    /// When true, `GetTasksReadyToAutoStart` considers this task once its
    /// last incomplete blocker resolves (spec.md §4.7).
    pub auto_start: bool,
}

impl Task {
    pub const MIN_PRIORITY: u8 = 1;
    pub const MAX_PRIORITY: u8 = 5;

    /// True if any dependency's status (as reported by `blocker_status`) is
    /// not yet terminal. A dependency absent from `blocker_status` is
    /// treated as non-terminal (still blocking) since its outcome is
    /// unknown to the caller.
    pub fn is_blocked(&self, blocker_status: impl Fn(TaskId) -> Option<TaskStatus>) -> bool {
        self.dependencies.iter().any(|&dep| {
            !blocker_status(dep).map(TaskStatus::is_terminal).unwrap_or(false)
        })
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            title: String = "demo task",
            description: String = "do the thing",
            base_branch: String = "main",
        }
        set {
            project_id: ProjectId = ProjectId::new(),
            quest_id: Option<QuestId> = None,
            hat: Hat = Hat::Explorer,
            status: TaskStatus = TaskStatus::Pending,
            priority: u8 = 3,
            dependencies: Vec<TaskId> = Vec::new(),
            worktree_path: Option<String> = None,
            branch_name: Option<String> = None,
            token_budget: u64 = 50_000,
            token_used: u64 = 0,
            created_at_ms: u64 = 0,
            started_at_ms: Option<u64> = None,
            completed_at_ms: Option<u64> = None,
            auto_start: bool = false,
        }
        computed {
            id: TaskId = TaskId::new(),
        }
    }
}

/// Errors from mutating a task dependency graph (spec.md §3 invariant: the
/// dependency graph must stay acyclic).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyGraphError {
    #[error("adding dependency {dependency} to task {task} would create a cycle")]
    WouldCreateCycle { task: TaskId, dependency: TaskId },
}

/// A task dependency graph: edges point from a task to the tasks that block
/// it. Used by the scheduler/task repository to validate new edges before
/// they're persisted (spec.md §3, §9).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<TaskId, Vec<TaskId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dependencies_of(&self, task: TaskId) -> &[TaskId] {
        self.edges.get(&task).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records that `task` depends on `dependency`, rejecting the edge if it
    /// would introduce a cycle. The graph is left unchanged on error.
    pub fn add_dependency(&mut self, task: TaskId, dependency: TaskId) -> Result<(), DependencyGraphError> {
        if task == dependency || self.reaches(dependency, task) {
            return Err(DependencyGraphError::WouldCreateCycle { task, dependency });
        }
        self.edges.entry(task).or_default().push(dependency);
        Ok(())
    }

    /// True if `from` can reach `to` by following dependency edges.
    fn reaches(&self, from: TaskId, to: TaskId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            stack.extend(self.dependencies_of(node).iter().copied());
        }
        false
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
