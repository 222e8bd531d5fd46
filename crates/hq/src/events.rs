// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Events HQ emits as a side effect of scheduler/worker-manager/unblock
//! decisions, for whatever surfaces HQ (UI, notifications) — out of scope
//! per spec.md §1, so these are data, not delivered anywhere by this crate.

use hqw_core::{ObjectiveId, TaskId};
use hqw_core::WorkerId;

/// Something HQ's internal components decided, worth surfacing (spec.md
/// §4.7 "Failures emit an event", §4.9 "surfaced to HQ as `worker_lost`",
/// §8 S6 "`task.auto_started` event is emitted").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HqEvent {
    /// A worker missed `heartbeat_interval * 3` consecutive beats; the
    /// objective it was running (if any) needs reassignment.
    WorkerLost { worker_id: WorkerId, objective_id: Option<ObjectiveId> },
    /// `dispatch -> accepted` did not complete within the bounded timeout
    /// (spec.md §4.9, §5 "dispatch->accepted 30s").
    DispatchTimedOut { worker_id: WorkerId, objective_id: ObjectiveId },
    /// A dependency-driven auto-start succeeded (spec.md §8 S6).
    TaskAutoStarted { task_id: TaskId, inherited_worktree: Option<String> },
    /// A dependency-driven auto-start attempt failed; the task is left
    /// `ready` rather than transitioned (spec.md §4.7 "Failures emit an
    /// event and leave the task ready").
    TaskAutoStartFailed { task_id: TaskId, reason: String },
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
