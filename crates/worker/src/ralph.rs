// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The Ralph Loop (spec.md §4.5): one call to [`RalphLoop::run`] per
//! session, iterating LLM calls and tool executions, checkpointing after
//! each iteration, and terminating on a hat-machine completion, a budget
//! ceiling, or cancellation.

use crate::activity::ActivityRecorder;
use hqw_adapters::{
    ChatRequest, ChatResponse, LlmClient, LlmError, ToolCall, ToolExecution, ToolExecutor, ToolSchema, WorkflowEffect,
    ScratchpadField, ScratchpadListField,
};
use hqw_core::{
    ActivityEvent, ActivityKind, Clock, Hat, HatCompletion, Objective, Report, ReportStatus, Session, SessionStatus,
    TransitionEngine,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fixed retry schedule for retryable LLM errors (spec.md §4.5, §7): three
/// attempts beyond the first, then the error fails the session.
const RETRY_BACKOFF_MS: [u64; 3] = [100, 400, 1600];

fn role_prompt(hat: Hat) -> &'static str {
    match hat {
        Hat::Explorer => "You are in the explorer role: investigate the codebase and problem space before proposing changes.",
        Hat::Planner => "You are in the planner role: turn the explored problem into a concrete, ordered plan.",
        Hat::Designer => "You are in the designer role: decide the shape of the solution before writing code.",
        Hat::Creator => "You are in the creator role: implement the plan.",
        Hat::Critic => "You are in the critic role: review the current changes for correctness and completeness.",
        Hat::Editor => "You are in the editor role: make the final polish pass; this role ends the task.",
        Hat::Resolver => "You are in the resolver role: resolve the critic's findings.",
    }
}

/// Per-run tool schemas the Ralph Loop advertises to the LLM. Kept as a
/// fixed list of workflow tools: the sandboxed execution tools themselves
/// are an external collaborator's concern (spec.md §1 Non-goals).
pub fn workflow_tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "signal_event".to_string(),
            description: "Signal that this hat's work is done, optionally naming the next hat.".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {"target_hat": {"type": "string"}}}),
        },
        ToolSchema {
            name: "checklist_update".to_string(),
            description: "Mark a checklist item done or not done.".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {"item": {"type": "string"}, "done": {"type": "boolean"}}}),
        },
        ToolSchema {
            name: "scratchpad_update".to_string(),
            description: "Update a scratchpad field.".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        },
        ToolSchema {
            name: "memory_store".to_string(),
            description: "Store a free-form key/value for later iterations.".to_string(),
            parameters: serde_json::json!({"type": "object", "properties": {"key": {"type": "string"}}}),
        },
    ]
}

/// Consecutive checkpoint failures at which a session degrades and aborts,
/// both in the same step (spec.md §7, §9; see [`SessionStatus::Degraded`]).
const DEGRADE_AFTER_FAILURES: u8 = 2;

/// The iterative LLM-tool execution loop for one session (spec.md §4.5).
pub struct RalphLoop<C: Clock> {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolExecutor>,
    store: Arc<hqw_store::LocalStore>,
    clock: C,
    tool_schemas: Vec<ToolSchema>,
}

impl<C: Clock> RalphLoop<C> {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolExecutor>,
        store: Arc<hqw_store::LocalStore>,
        clock: C,
    ) -> Self {
        Self { llm, tools, store, clock, tool_schemas: workflow_tool_schemas() }
    }

    /// Run `session` to completion, cancellation, or budget exhaustion
    /// (spec.md §4.5). Infallible: every outcome, including a panic-free
    /// propagated core error, is folded into a terminated [`Report`].
    ///
    /// `RestoreFromCheckpoint` (spec.md §4.5) is simply calling this with a
    /// `session` loaded from the local store: `conversation` is restored
    /// verbatim as part of the persisted `Session`, so there is no separate
    /// runtime state to rebuild.
    pub async fn run(
        &self,
        mut session: Session,
        objective: &Objective,
        recorder: &ActivityRecorder,
        cancel: CancellationToken,
    ) -> Report {
        let mut checklist: HashMap<String, bool> = HashMap::new();

        loop {
            if cancel.is_cancelled() {
                return self.terminate(session, ReportStatus::Cancelled, "cancelled".to_string());
            }

            let request = self.build_request(&session, objective, &checklist);
            let response = match self.call_llm_with_retry(request, &cancel).await {
                Ok(response) => response,
                Err(e) => return self.terminate(session, ReportStatus::Failed, format!("llm error: {e}")),
            };

            if let Err(e) = recorder.record(self.activity_event(
                &session,
                ActivityKind::AssistantMessage { content: response.text.clone() },
            )) {
                warn!(error = %e, "failed to record assistant_message activity");
            }
            session.tokens_input += response.tokens_input;
            session.tokens_output += response.tokens_output;

            let mut signalled_hat: Option<Option<String>> = None;
            for call in &response.tool_calls {
                if let Err(e) = recorder.record(self.activity_event(
                    &session,
                    ActivityKind::ToolCall { name: call.name.clone(), arguments: call.arguments.clone() },
                )) {
                    warn!(error = %e, "failed to record tool_call activity");
                }

                let execution = self.run_tool_call(call, &session, &cancel).await;
                for effect in &execution.effects {
                    if let WorkflowEffect::SignalEvent { target_hat } = effect {
                        signalled_hat = Some(target_hat.clone());
                    }
                    self.apply_effect(&mut session, &mut checklist, effect);
                }
                if let Err(e) = recorder.record(self.activity_event(
                    &session,
                    ActivityKind::ToolResult {
                        name: call.name.clone(),
                        output: execution.output.clone(),
                        is_error: execution.is_error,
                    },
                )) {
                    warn!(error = %e, "failed to record tool_result activity");
                }
            }

            let hat_outcome = match signalled_hat {
                Some(target) => self.advance_hat(&mut session, target),
                None => HatOutcome::Continue,
            };

            session.iteration += 1;
            if !self.checkpoint(&mut session) {
                return self.terminate(session, ReportStatus::Failed, "checkpoint failed".to_string());
            }

            if let HatOutcome::Complete = hat_outcome {
                return self.terminate(session, ReportStatus::Completed, "task complete".to_string());
            }

            if let Some(status) = self.check_budgets(&session, objective) {
                return self.terminate(session, status, "budget exceeded".to_string());
            }
        }
    }

    fn build_request(
        &self,
        session: &Session,
        objective: &Objective,
        checklist: &HashMap<String, bool>,
    ) -> ChatRequest {
        let system_prompt = format!(
            "{}\n\nObjective: {}\n{}\n\nScratchpad:\nunderstanding: {}\nplan: {}\n\nChecklist: {:?}",
            role_prompt(session.hat),
            objective.title,
            objective.description,
            session.scratchpad.understanding,
            session.scratchpad.plan,
            checklist,
        );
        ChatRequest {
            model: "configured-model".to_string(),
            system_prompt,
            messages: session.conversation.clone(),
            tools: self.tool_schemas.clone(),
        }
    }

    async fn call_llm_with_retry(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, LlmError> {
        let mut attempt = 0usize;
        loop {
            match self.llm.chat(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < RETRY_BACKOFF_MS.len() => {
                    let delay = RETRY_BACKOFF_MS[attempt];
                    attempt += 1;
                    info!(attempt, delay_ms = delay, "retrying llm call after retryable error");
                    tokio::select! {
                        _ = tokio::time::sleep(std::time::Duration::from_millis(delay)) => {}
                        _ = cancel.cancelled() => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_tool_call(&self, call: &ToolCall, session: &Session, cancel: &CancellationToken) -> ToolExecution {
        self.tools.execute(call, &session.work_dir, cancel.clone()).await
    }

    fn apply_effect(&self, session: &mut Session, checklist: &mut HashMap<String, bool>, effect: &WorkflowEffect) {
        match effect {
            WorkflowEffect::ChecklistUpdate { item, done } => {
                checklist.insert(item.clone(), *done);
            }
            WorkflowEffect::ScratchpadUpdate { field, value } => match field {
                ScratchpadField::Understanding => session.scratchpad.understanding = value.clone(),
                ScratchpadField::Plan => session.scratchpad.plan = value.clone(),
            },
            WorkflowEffect::ScratchpadAppend { field, entry } => match field {
                ScratchpadListField::Decisions => session.scratchpad.decisions.push(entry.clone()),
                ScratchpadListField::Blockers => session.scratchpad.blockers.push(entry.clone()),
            },
            // `Session` has no memory field to write this into; the effect
            // is acknowledged to the tool but not persisted anywhere.
            WorkflowEffect::MemoryStore { .. } => {}
            WorkflowEffect::SignalEvent { .. } => {}
        }
    }

    /// Validate and apply a `signal_event` through the Transition Engine
    /// (spec.md §4.5, §4.8). An invalid transition leaves the hat unchanged.
    fn advance_hat(&self, session: &mut Session, target_hat: Option<String>) -> HatOutcome {
        let engine = TransitionEngine::new();
        match target_hat.as_deref().and_then(parse_hat) {
            Some(target) => {
                if engine.validate_transition(session.hat, target) {
                    session.hat = target;
                    HatOutcome::Continue
                } else {
                    warn!(from = %session.hat, to = %target, "invalid hat transition, staying on current hat");
                    HatOutcome::Continue
                }
            }
            None => match engine.on_hat_complete(session.hat) {
                HatCompletion::Next(next) => {
                    session.hat = next;
                    HatOutcome::Continue
                }
                HatCompletion::TaskComplete => HatOutcome::Complete,
            },
        }
    }

    /// Checkpoint the session (spec.md §4.5 step 6). A single transient
    /// failure is logged and retried on the next iteration without
    /// degrading; the second *consecutive* failure degrades the session
    /// and aborts it in the same step, since by then it has already
    /// diverged from durable state (spec.md §7: "two consecutive failures
    /// downgrade the session to `degraded` and abort it").
    fn checkpoint(&self, session: &mut Session) -> bool {
        session.last_checkpoint_at_ms = self.clock.epoch_ms();
        match self.store.checkpoint_session(session.clone()) {
            Ok(()) => {
                session.consecutive_checkpoint_failures = 0;
                if session.status == SessionStatus::Degraded {
                    session.status = SessionStatus::Running;
                }
                true
            }
            Err(e) => {
                session.consecutive_checkpoint_failures += 1;
                if session.consecutive_checkpoint_failures >= DEGRADE_AFTER_FAILURES {
                    warn!(error = %e, "second consecutive checkpoint failure, degrading and failing session");
                    session.status = SessionStatus::Degraded;
                    false
                } else {
                    warn!(error = %e, failures = session.consecutive_checkpoint_failures, "checkpoint failed, will retry next iteration");
                    true
                }
            }
        }
    }

    fn check_budgets(&self, session: &Session, objective: &Objective) -> Option<ReportStatus> {
        if session.total_tokens() >= objective.token_budget {
            return Some(ReportStatus::BudgetExceeded);
        }
        if session.iteration >= objective.max_iterations {
            return Some(ReportStatus::BudgetExceeded);
        }
        if let Some(cap) = objective.wall_clock_budget_secs {
            let elapsed_ms = self.clock.epoch_ms().saturating_sub(session.started_at_ms);
            if elapsed_ms >= cap.saturating_mul(1000) {
                return Some(ReportStatus::BudgetExceeded);
            }
        }
        None
    }

    fn activity_event(&self, session: &Session, kind: ActivityKind) -> ActivityEvent {
        ActivityEvent {
            id: hqw_core::ActivityEventId::new(),
            session_id: session.id,
            kind,
            iteration: session.iteration,
            recorded_at_ms: self.clock.epoch_ms(),
        }
    }

    fn terminate(&self, mut session: Session, status: ReportStatus, summary: String) -> Report {
        let completed_at_ms = self.clock.epoch_ms();
        session.status = match status {
            ReportStatus::Completed | ReportStatus::BudgetExceeded => SessionStatus::Completed,
            ReportStatus::Failed => SessionStatus::Failed,
            ReportStatus::Cancelled => SessionStatus::Cancelled,
        };
        if let Err(e) = self.store.checkpoint_session(session.clone()) {
            warn!(error = %e, "failed to persist final session state");
        }
        Report {
            status,
            summary,
            iterations: session.iteration,
            total_tokens: session.total_tokens(),
            completed_at_ms,
        }
    }
}

enum HatOutcome {
    Continue,
    Complete,
}

fn parse_hat(name: &str) -> Option<Hat> {
    Hat::ALL.into_iter().find(|h| h.to_string() == name)
}

#[cfg(test)]
#[path = "ralph_tests.rs"]
mod tests;
