// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! A concrete [`ToolExecutor`]: workflow tools mutate loop state via
//! [`WorkflowEffect`] (spec.md §9 design note), everything else runs as a
//! subprocess in the session's work_dir. This is deliberately thin — "a
//! specific tool sandbox" is a non-goal (spec.md §1) — but a worker binary
//! needs *some* executor to run for real, not just the fakes tests use.

use crate::llm::ToolCall;
use crate::tool_executor::{ToolExecution, ToolExecutor};
use crate::workflow_effect::{ScratchpadField, ScratchpadListField, WorkflowEffect};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Runs `signal_event`/`checklist_update`/`scratchpad_update`/`memory_store`
/// as pure state mutations and everything else as `sh -c <command>` in
/// `work_dir`, capturing stdout+stderr and the exit status.
pub struct ProcessToolExecutor;

impl ProcessToolExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn workflow_effect(call: &ToolCall) -> Option<WorkflowEffect> {
    let args = &call.arguments;
    match call.name.as_str() {
        "signal_event" => Some(WorkflowEffect::SignalEvent {
            target_hat: args.get("target_hat").and_then(|v| v.as_str()).map(str::to_string),
        }),
        "checklist_update" => Some(WorkflowEffect::ChecklistUpdate {
            item: args.get("item").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            done: args.get("done").and_then(|v| v.as_bool()).unwrap_or(false),
        }),
        "scratchpad_update" => {
            let value = args.get("value").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            match args.get("field").and_then(|v| v.as_str()) {
                Some("understanding") => Some(WorkflowEffect::ScratchpadUpdate { field: ScratchpadField::Understanding, value }),
                Some("plan") => Some(WorkflowEffect::ScratchpadUpdate { field: ScratchpadField::Plan, value }),
                Some("decisions") => Some(WorkflowEffect::ScratchpadAppend { field: ScratchpadListField::Decisions, entry: value }),
                Some("blockers") => Some(WorkflowEffect::ScratchpadAppend { field: ScratchpadListField::Blockers, entry: value }),
                _ => None,
            }
        }
        "memory_store" => Some(WorkflowEffect::MemoryStore {
            key: args.get("key").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            value: args.get("value").cloned().unwrap_or(serde_json::Value::Null),
        }),
        _ => None,
    }
}

#[async_trait]
impl ToolExecutor for ProcessToolExecutor {
    async fn execute(&self, call: &ToolCall, work_dir: &Path, cancel: CancellationToken) -> ToolExecution {
        if let Some(effect) = workflow_effect(call) {
            return ToolExecution::ok(serde_json::json!({"ok": true}), 0).with_effects(vec![effect]);
        }

        let Some(shell_command) = call.arguments.get("command").and_then(|v| v.as_str()) else {
            return ToolExecution::error(format!("tool '{}' has no 'command' argument", call.name), 0);
        };

        let started = Instant::now();
        let mut child = match Command::new("sh")
            .arg("-c")
            .arg(shell_command)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return ToolExecution::error(format!("failed to spawn tool process: {e}"), 0),
        };

        let output = tokio::select! {
            result = child.wait_with_output() => result,
            _ = cancel.cancelled() => {
                return ToolExecution::error("cancelled", started.elapsed().as_millis() as u64);
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                ToolExecution {
                    output: serde_json::json!({"stdout": stdout, "stderr": stderr, "exit_code": output.status.code()}),
                    is_error: !output.status.success(),
                    duration_ms,
                    effects: Vec::new(),
                }
            }
            Err(e) => ToolExecution::error(format!("tool process failed: {e}"), duration_ms),
        }
    }
}

#[cfg(test)]
#[path = "process_tool_executor_tests.rs"]
mod tests;
