// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Newtype identifiers for every addressable entity in the system.

crate::define_id! {
    /// Unique identifier for an objective dispatched to a worker.
    pub struct ObjectiveId("obj-");
}

crate::define_id! {
    /// Unique identifier for one execution attempt of an objective.
    pub struct SessionId("ses-");
}

crate::define_id! {
    /// Unique identifier for a task tracked by HQ's scheduler.
    pub struct TaskId("tsk-");
}

crate::define_id! {
    /// Client-generated idempotence key for an activity event (spec.md §3, §8.8).
    pub struct ActivityEventId("act-");
}

crate::define_id! {
    /// Unique identifier for a project a task/objective targets.
    pub struct ProjectId("prj-");
}

crate::define_id! {
    /// Unique identifier for a quest (a group of related tasks).
    pub struct QuestId("qst-");
}

/// Stable worker identity string (not a random id — chosen at worker
/// creation time and reused across restarts, per spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::borrow::Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
