// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Activity events: the append-only record of what a session did.

use crate::ids::{ActivityEventId, SessionId};
use serde::{Deserialize, Serialize};

/// One recorded happening inside a session (spec.md §4.4).
///
/// Tagged by `kind` on the wire so HQ can deserialize without first knowing
/// which variant it received, matching the tagged-enum convention used for
/// wire messages elsewhere in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityKind {
    UserMessage { content: String },
    AssistantMessage { content: String },
    ToolCall { name: String, arguments: serde_json::Value },
    ToolResult { name: String, output: serde_json::Value, is_error: bool },
    Status { message: String },
    Error { message: String },
}

/// An activity event as persisted in the local store and synced to HQ
/// (spec.md §4.3, §4.4).
///
/// `id` is client-generated (spec.md §3, §8.8) so it doubles as the
/// idempotence key: replaying the same event twice, e.g. after a crash and
/// resume, must not duplicate it downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: ActivityEventId,
    pub session_id: SessionId,
    pub kind: ActivityKind,
    pub iteration: u32,
    pub recorded_at_ms: u64,
}

crate::builder! {
    pub struct ActivityEventBuilder => ActivityEvent {
        set {
            session_id: SessionId = SessionId::new(),
            kind: ActivityKind = ActivityKind::Status { message: "started".to_string() },
            iteration: u32 = 0,
            recorded_at_ms: u64 = 0,
        }
        computed {
            id: ActivityEventId = ActivityEventId::new(),
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
