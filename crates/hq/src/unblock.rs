// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The Unblock Handler: dependency-driven auto-start with worktree
//! inheritance (spec.md §4.7, §8 S6).

use crate::events::HqEvent;
use crate::task_repository::TaskRepository;
use async_trait::async_trait;
use hqw_core::{Task, TaskId};

/// Starts a task that has just become unblocked, inheriting the predecessor's
/// working copy (spec.md §4.7 `StartTaskWithInheritance`). The concrete
/// implementation lives with the HQ dispatch loop (it needs the scheduler,
/// worker manager, and task repository together); this crate only describes
/// the seam, mirroring the `TaskRepository` split.
#[async_trait]
pub trait TaskStarter: Send + Sync {
    async fn start_task_with_inheritance(
        &self,
        task_id: TaskId,
        inherited_worktree: Option<String>,
        predecessor_handoff: String,
    ) -> Result<(), UnblockError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UnblockError {
    #[error("{0}")]
    StartFailed(String),
}

/// Runs when `completed_task` reaches `completed` (spec.md §4.7): finds every
/// `auto_start` task whose last incomplete blocker was `completed_task`, and
/// starts each inheriting its working copy. A task whose start attempt fails
/// is left exactly as it was (spec.md §4.7 "leave the task ready") and an
/// event is emitted instead of an error bubbling up, since one failed
/// auto-start must not abort the others (spec.md §8 S6).
pub async fn handle_task_completed(
    repo: &dyn TaskRepository,
    starter: &dyn TaskStarter,
    completed_task: &Task,
    predecessor_handoff: String,
) -> Vec<HqEvent> {
    let candidates = repo.get_tasks_ready_to_auto_start(completed_task.id).await;
    let mut events = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let inherited_worktree = completed_task.worktree_path.clone();
        match starter
            .start_task_with_inheritance(candidate.id, inherited_worktree.clone(), predecessor_handoff.clone())
            .await
        {
            Ok(()) => events.push(HqEvent::TaskAutoStarted { task_id: candidate.id, inherited_worktree }),
            Err(err) => events.push(HqEvent::TaskAutoStartFailed { task_id: candidate.id, reason: err.to_string() }),
        }
    }
    events
}

#[cfg(test)]
#[path = "unblock_tests.rs"]
mod tests;
