// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The Tool Executor collaborator: runs a single tool call in a session's
//! work_dir (spec.md §4.5 step 4).

use crate::llm::ToolCall;
use crate::workflow_effect::WorkflowEffect;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// The outcome of one tool call.
///
/// Never an `Err`: "any panic in tool execution is captured into a
/// `tool_result` with `is_error=true`" (spec.md §4.5), so a concrete
/// executor is expected to catch panics from subprocess/child-tool code and
/// fold them into `is_error` rather than letting them unwind past this call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecution {
    pub output: serde_json::Value,
    pub is_error: bool,
    pub duration_ms: u64,
    /// Non-empty only for "workflow tools" (spec.md §4.5, §9): these never
    /// run a subprocess, they just mutate loop-owned state.
    pub effects: Vec<WorkflowEffect>,
}

impl ToolExecution {
    pub fn ok(output: serde_json::Value, duration_ms: u64) -> Self {
        Self { output, is_error: false, duration_ms, effects: Vec::new() }
    }

    pub fn error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            output: serde_json::json!({ "error": message.into() }),
            is_error: true,
            duration_ms,
            effects: Vec::new(),
        }
    }

    pub fn with_effects(mut self, effects: Vec<WorkflowEffect>) -> Self {
        self.effects = effects;
        self
    }
}

/// Runs tool calls the LLM requests. A specific tool sandbox is a non-goal
/// (spec.md §1); [`crate::ProcessToolExecutor`] is a thin, unsandboxed
/// implementation sufficient to run a worker binary for real.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall, work_dir: &Path, cancel: CancellationToken) -> ToolExecution;
}

#[cfg(test)]
#[path = "tool_executor_tests.rs"]
mod tests;
