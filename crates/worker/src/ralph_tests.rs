// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;
use crate::activity::ActivityRecorder;
use hqw_adapters::{ChatResponse, FakeLlmClient, FakeToolExecutor, FakeWorktreeManager, ToolCall, ToolExecution};
use hqw_core::{FakeClock, ObjectiveBuilder, SessionId};
use hqw_crypto::{MasterKey, StoreCipher};
use hqw_store::LocalStore;
use tempfile::tempdir;

fn store() -> Arc<LocalStore> {
    let dir = tempdir().unwrap();
    let cipher = StoreCipher::from_master_key(&MasterKey::generate());
    Arc::new(LocalStore::open(dir.path().join("worker.db"), cipher).unwrap())
}

fn session(hat: Hat) -> Session {
    let mut s = Session {
        id: SessionId::new(),
        objective_id: hqw_core::ObjectiveId::new(),
        hat,
        work_dir: std::path::PathBuf::from("/tmp/ralph-test"),
        iteration: 0,
        tokens_input: 0,
        tokens_output: 0,
        conversation: Vec::new(),
        scratchpad: hqw_core::Scratchpad::default(),
        started_at_ms: 0,
        last_checkpoint_at_ms: 0,
        status: SessionStatus::Running,
        consecutive_checkpoint_failures: 0,
    };
    s.work_dir = std::path::PathBuf::from("/tmp/ralph-test");
    s
}

#[tokio::test]
async fn terminal_hat_completes_after_signal_event() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Editor).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    let response = ChatResponse {
        text: "final".to_string(),
        tokens_input: 3,
        tokens_output: 3,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({}) }],
    };
    let tools = Arc::new(FakeToolExecutor::new());
    tools.script("signal_event", ToolExecution::ok(serde_json::Value::Null, 1).with_effects(vec![WorkflowEffect::SignalEvent { target_hat: None }]));

    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![Ok(response)])), tools, store, FakeClock::new());
    let report = ralph.run(session(Hat::Editor), &objective, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.total_tokens, 6);
}

#[tokio::test]
async fn creator_signal_event_with_no_target_moves_to_critic() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Creator).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    let first = ChatResponse {
        text: "work".to_string(),
        tokens_input: 1,
        tokens_output: 1,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({}) }],
    };
    let second = ChatResponse {
        text: "critique done".to_string(),
        tokens_input: 1,
        tokens_output: 1,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({}) }],
    };
    let tools = Arc::new(FakeToolExecutor::new());
    tools.script("signal_event", ToolExecution::ok(serde_json::Value::Null, 1).with_effects(vec![WorkflowEffect::SignalEvent { target_hat: None }]));
    tools.script("signal_event", ToolExecution::ok(serde_json::Value::Null, 1).with_effects(vec![WorkflowEffect::SignalEvent { target_hat: None }]));

    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![Ok(first), Ok(second)])), tools, store, FakeClock::new());
    let report = ralph.run(session(Hat::Creator), &objective, &recorder, CancellationToken::new()).await;

    // creator -> critic (iteration 1, not complete), critic signalling completion -> task complete (iteration 2)
    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.iterations, 2);
}

#[tokio::test]
async fn named_target_hat_transition_is_validated() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Explorer).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    // explorer -> creator is allowed; the loop should switch hats and continue.
    let valid = ChatResponse {
        text: "explored".to_string(),
        tokens_input: 1,
        tokens_output: 1,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({"target_hat": "creator"}) }],
    };
    let finish = ChatResponse {
        text: "created".to_string(),
        tokens_input: 1,
        tokens_output: 1,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({}) }],
    };
    let tools = Arc::new(FakeToolExecutor::new());
    tools.script("signal_event", ToolExecution::ok(serde_json::Value::Null, 1).with_effects(vec![WorkflowEffect::SignalEvent { target_hat: Some("creator".to_string()) }]));
    tools.script("signal_event", ToolExecution::ok(serde_json::Value::Null, 1).with_effects(vec![WorkflowEffect::SignalEvent { target_hat: None }]));

    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![Ok(valid), Ok(finish)])), tools, store, FakeClock::new());
    let report = ralph.run(session(Hat::Explorer), &objective, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.iterations, 2);
}

#[tokio::test]
async fn invalid_hat_transition_keeps_current_hat_and_continues() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Editor).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    // editor is terminal; naming an invalid "explorer" target is rejected,
    // the loop stays on editor and continues to the next iteration.
    let invalid = ChatResponse {
        text: "attempt".to_string(),
        tokens_input: 1,
        tokens_output: 1,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({"target_hat": "explorer"}) }],
    };
    let finish = ChatResponse {
        text: "done".to_string(),
        tokens_input: 1,
        tokens_output: 1,
        tool_calls: vec![ToolCall { name: "signal_event".to_string(), arguments: serde_json::json!({}) }],
    };
    let tools = Arc::new(FakeToolExecutor::new());
    tools.script("signal_event", ToolExecution::ok(serde_json::Value::Null, 1).with_effects(vec![WorkflowEffect::SignalEvent { target_hat: Some("explorer".to_string()) }]));
    tools.script("signal_event", ToolExecution::ok(serde_json::Value::Null, 1).with_effects(vec![WorkflowEffect::SignalEvent { target_hat: None }]));

    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![Ok(invalid), Ok(finish)])), tools, store, FakeClock::new());
    let report = ralph.run(session(Hat::Editor), &objective, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.iterations, 2);
}

#[tokio::test]
async fn cancellation_before_an_iteration_starts_returns_cancelled() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Creator).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![])), Arc::new(FakeToolExecutor::new()), store, FakeClock::new());
    let report = ralph.run(session(Hat::Creator), &objective, &recorder, cancel).await;

    assert_eq!(report.status, ReportStatus::Cancelled);
    assert_eq!(report.iterations, 0);
}

#[tokio::test]
async fn token_budget_exhaustion_ends_the_loop() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Creator).token_budget(5).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    let response = ChatResponse { text: "work".to_string(), tokens_input: 3, tokens_output: 3, tool_calls: vec![] };
    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![Ok(response)])), Arc::new(FakeToolExecutor::new()), store, FakeClock::new());
    let report = ralph.run(session(Hat::Creator), &objective, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::BudgetExceeded);
    assert_eq!(report.total_tokens, 6);
}

#[tokio::test]
async fn max_iterations_exhaustion_ends_the_loop() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Creator).max_iterations(2).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    let responses = vec![
        Ok(ChatResponse { text: "a".to_string(), tokens_input: 1, tokens_output: 1, tool_calls: vec![] }),
        Ok(ChatResponse { text: "b".to_string(), tokens_input: 1, tokens_output: 1, tool_calls: vec![] }),
    ];
    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(responses)), Arc::new(FakeToolExecutor::new()), store, FakeClock::new());
    let report = ralph.run(session(Hat::Creator), &objective, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::BudgetExceeded);
    assert_eq!(report.iterations, 2);
}

#[tokio::test]
async fn retryable_llm_error_retries_then_succeeds() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Creator).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    let responses = vec![
        Err(hqw_adapters::LlmError::RateLimit),
        Ok(ChatResponse { text: "recovered".to_string(), tokens_input: 1, tokens_output: 1, tool_calls: vec![] }),
    ];
    let llm = Arc::new(FakeLlmClient::new(responses));
    let objective_long_budget = ObjectiveBuilder::default().hat(Hat::Creator).max_iterations(1).build();
    let ralph = RalphLoop::new(llm.clone(), Arc::new(FakeToolExecutor::new()), store, FakeClock::new());
    let report = ralph.run(session(Hat::Creator), &objective_long_budget, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::BudgetExceeded);
    assert_eq!(llm.requests().len(), 2);
    let _ = &objective;
}

#[tokio::test]
async fn unretryable_llm_error_fails_the_session() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Creator).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    let ralph = RalphLoop::new(
        Arc::new(FakeLlmClient::new(vec![Err(hqw_adapters::LlmError::Unauthorized("bad key".to_string()))])),
        Arc::new(FakeToolExecutor::new()),
        store,
        FakeClock::new(),
    );
    let report = ralph.run(session(Hat::Creator), &objective, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::Failed);
}

#[tokio::test]
async fn checkpoint_retries_once_then_degrades_and_fails_on_the_second_failure() {
    let dir = tempdir().unwrap();
    let store_path = dir.path().join("worker.db");
    let cipher = StoreCipher::from_master_key(&MasterKey::generate());
    let store = Arc::new(LocalStore::open(&store_path, cipher).unwrap());

    // The store opened against a path that didn't exist yet. Replacing it
    // with a directory makes every subsequent checkpoint's rename-over-it
    // fail, simulating a persistently broken store without touching its
    // internals.
    std::fs::create_dir_all(&store_path).unwrap();

    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![])), Arc::new(FakeToolExecutor::new()), store, FakeClock::new());
    let mut s = session(Hat::Creator);

    // First failure: logged and retried next iteration, status untouched.
    assert!(ralph.checkpoint(&mut s));
    assert_eq!(s.consecutive_checkpoint_failures, 1);
    assert_eq!(s.status, SessionStatus::Running);

    // Second consecutive failure: degrade and abort in the same step.
    assert!(!ralph.checkpoint(&mut s));
    assert_eq!(s.consecutive_checkpoint_failures, 2);
    assert_eq!(s.status, SessionStatus::Degraded);
}

#[tokio::test]
async fn checkpoint_restores_running_status_after_a_later_success() {
    let store = store();
    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![])), Arc::new(FakeToolExecutor::new()), store, FakeClock::new());

    let mut s = session(Hat::Creator);
    s.status = SessionStatus::Degraded;
    s.consecutive_checkpoint_failures = 1;

    assert!(ralph.checkpoint(&mut s));
    assert_eq!(s.status, SessionStatus::Running);
    assert_eq!(s.consecutive_checkpoint_failures, 0);
}

#[tokio::test]
async fn scratchpad_and_checklist_effects_are_applied() {
    let store = store();
    let objective = ObjectiveBuilder::default().hat(Hat::Creator).build();
    let recorder = ActivityRecorder::new(store.clone(), objective.id, SessionId::new());

    let response = ChatResponse {
        text: "planning".to_string(),
        tokens_input: 1,
        tokens_output: 1,
        tool_calls: vec![
            ToolCall { name: "scratchpad_update".to_string(), arguments: serde_json::json!({}) },
            ToolCall { name: "checklist_update".to_string(), arguments: serde_json::json!({}) },
        ],
    };
    let tools = Arc::new(FakeToolExecutor::new());
    tools.script(
        "scratchpad_update",
        ToolExecution::ok(serde_json::Value::Null, 1)
            .with_effects(vec![WorkflowEffect::ScratchpadUpdate { field: hqw_adapters::ScratchpadField::Plan, value: "new plan".to_string() }]),
    );
    tools.script(
        "checklist_update",
        ToolExecution::ok(serde_json::Value::Null, 1)
            .with_effects(vec![WorkflowEffect::ChecklistUpdate { item: "write tests".to_string(), done: true }]),
    );

    let max_one = ObjectiveBuilder::default().hat(Hat::Creator).max_iterations(1).build();
    let ralph = RalphLoop::new(Arc::new(FakeLlmClient::new(vec![Ok(response)])), tools, store.clone(), FakeClock::new());
    let report = ralph.run(session(Hat::Creator), &max_one, &recorder, CancellationToken::new()).await;

    assert_eq!(report.status, ReportStatus::BudgetExceeded);
    let _ = objective;
}
