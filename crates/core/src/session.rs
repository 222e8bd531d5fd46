// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Session: one execution attempt for one objective.

use crate::hat::Hat;
use crate::ids::{ObjectiveId, SessionId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structured scratchpad state the Ralph Loop maintains across iterations
/// (spec.md §3). Workflow tools (`OnScratchpadUpdate`) mutate this through
/// the loop rather than holding a reference to it directly (spec.md §9).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scratchpad {
    pub understanding: String,
    pub plan: String,
    pub decisions: Vec<String>,
    pub blockers: Vec<String>,
    pub last_action: Option<String>,
}

/// Lifecycle status of a session (spec.md §3, §4.3).
///
/// `Degraded` is the resolution of spec.md §9's open question: a single
/// checkpoint write failure is retried on the next iteration without
/// changing status, and the second *consecutive* failure moves a session
/// here and fails it outright in the same step (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    Crashed,
    Declined,
    Degraded,
}

crate::simple_display! {
    SessionStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        Crashed => "crashed",
        Declined => "declined",
        Degraded => "degraded",
    }
}

impl SessionStatus {
    /// A session in one of these statuses will never run another iteration.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Running | SessionStatus::Degraded)
    }
}

/// One execution attempt for one objective (spec.md §3).
///
/// `conversation` is an opaque list of provider-format messages: the core
/// crate treats it as `serde_json::Value` because the exact shape is a
/// property of the external LLM collaborator's wire format (spec.md §1 lists
/// the LLM provider as out of scope).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub objective_id: ObjectiveId,
    pub hat: Hat,
    pub work_dir: PathBuf,
    pub iteration: u32,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub conversation: Vec<serde_json::Value>,
    pub scratchpad: Scratchpad,
    pub started_at_ms: u64,
    pub last_checkpoint_at_ms: u64,
    pub status: SessionStatus,
    /// Consecutive checkpoint write failures since the last success; reset
    /// to 0 on every successful checkpoint (spec.md §7, §9).
    #[serde(default)]
    pub consecutive_checkpoint_failures: u8,
}

impl Session {
    pub fn total_tokens(&self) -> u64 {
        self.tokens_input + self.tokens_output
    }
}

crate::builder! {
    pub struct SessionBuilder => Session {
        set {
            objective_id: ObjectiveId = ObjectiveId::new(),
            hat: Hat = Hat::Explorer,
            work_dir: PathBuf = PathBuf::from("/tmp/hqw-session"),
            iteration: u32 = 0,
            tokens_input: u64 = 0,
            tokens_output: u64 = 0,
            conversation: Vec<serde_json::Value> = Vec::new(),
            scratchpad: Scratchpad = Scratchpad::default(),
            started_at_ms: u64 = 0,
            last_checkpoint_at_ms: u64 = 0,
            status: SessionStatus = SessionStatus::Running,
            consecutive_checkpoint_failures: u8 = 0,
        }
        computed {
            id: SessionId = SessionId::new(),
        }
    }
}

/// Terminal outcome of a Ralph Loop run (spec.md §4.5).
///
/// Distinct from [`SessionStatus`]: `budget_exceeded` is "semantically
/// non-successful but not a runtime error" (spec.md §7) and is reported over
/// the wire as a `completed` message, while the underlying session is still
/// marked `SessionStatus::Completed` in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Completed,
    Failed,
    Cancelled,
    BudgetExceeded,
}

crate::simple_display! {
    ReportStatus {
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        BudgetExceeded => "budget_exceeded",
    }
}

/// What the Ralph Loop hands back to the Worker Runner when a session ends
/// (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub status: ReportStatus,
    pub summary: String,
    pub iterations: u32,
    pub total_tokens: u64,
    pub completed_at_ms: u64,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
