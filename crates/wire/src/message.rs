// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The message envelope and its sixteen payload variants (spec.md §4.1, §6).

use hqw_core::{ActivityEvent, Hat, Objective, ObjectiveId, ReportStatus, SessionId, WorkerId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A worker's self-reported state in `heartbeat`/`pong` payloads (spec.md §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Busy,
}

/// Sync cadence HQ asks the worker to honor for this dispatch (spec.md §4.4, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub activity_interval_sec: u64,
    pub heartbeat_interval_sec: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { activity_interval_sec: 30, heartbeat_interval_sec: 10 }
    }
}

/// The payload half of a [`Message`]: one variant per type tag in spec.md §4.1.
///
/// Adjacently tagged (`type` + `payload`) rather than internally tagged,
/// because the wire format is explicitly `{type, payload, sent_at}` and not
/// a flat object with the payload fields inlined next to `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MessagePayload {
    Ready {
        worker_id: WorkerId,
        version: String,
        public_key: String,
    },
    Dispatch {
        objective: Objective,
        sync: SyncConfig,
        dispatched_at_ms: u64,
    },
    Accepted {
        objective_id: ObjectiveId,
        session_id: SessionId,
    },
    Heartbeat {
        worker_id: WorkerId,
        state: WorkerState,
        objective_id: Option<ObjectiveId>,
        session_id: Option<SessionId>,
        iteration: u32,
        tokens_input: u64,
        tokens_output: u64,
        uptime_secs: u64,
    },
    Activity {
        objective_id: ObjectiveId,
        session_id: SessionId,
        events: Vec<ActivityEvent>,
    },
    Completed {
        status: ReportStatus,
        summary: String,
        iterations: u32,
        total_tokens: u64,
        completed_at_ms: u64,
    },
    Failed {
        objective_id: ObjectiveId,
        session_id: SessionId,
        error: String,
        iterations: u32,
    },
    Cancelled {},
    CrashReport {
        worker_id: WorkerId,
        objective_id: ObjectiveId,
        session_id: SessionId,
        hat: Hat,
        iteration: u32,
        tokens_input: u64,
        tokens_output: u64,
        work_dir: PathBuf,
        crashed_at_ms: u64,
        can_resume: bool,
    },
    Resume {
        session_id: SessionId,
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        encrypted_secrets: Vec<u8>,
    },
    Cancel {
        objective_id: ObjectiveId,
        reason: String,
    },
    Ping {},
    Pong {
        worker_id: WorkerId,
        state: WorkerState,
        objective_id: Option<ObjectiveId>,
    },
    Shutdown {},
    ShutdownAck {},
    Error {
        code: String,
        message: String,
    },
}

/// The full frame contents once length-prefix and JSON decoding have both
/// happened: `{type, payload, sent_at}` (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub sent_at_ms: u64,
}

impl Message {
    pub fn new(payload: MessagePayload, sent_at_ms: u64) -> Self {
        Self { payload, sent_at_ms }
    }

    /// The `type` tag this message serializes under, for logging.
    pub fn type_name(&self) -> &'static str {
        match &self.payload {
            MessagePayload::Ready { .. } => "ready",
            MessagePayload::Dispatch { .. } => "dispatch",
            MessagePayload::Accepted { .. } => "accepted",
            MessagePayload::Heartbeat { .. } => "heartbeat",
            MessagePayload::Activity { .. } => "activity",
            MessagePayload::Completed { .. } => "completed",
            MessagePayload::Failed { .. } => "failed",
            MessagePayload::Cancelled {} => "cancelled",
            MessagePayload::CrashReport { .. } => "crash_report",
            MessagePayload::Resume { .. } => "resume",
            MessagePayload::Cancel { .. } => "cancel",
            MessagePayload::Ping {} => "ping",
            MessagePayload::Pong { .. } => "pong",
            MessagePayload::Shutdown {} => "shutdown",
            MessagePayload::ShutdownAck {} => "shutdown_ack",
            MessagePayload::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
