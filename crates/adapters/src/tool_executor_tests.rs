// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;
use crate::workflow_effect::WorkflowEffect;

#[test]
fn ok_execution_has_no_error_and_no_effects() {
    let result = ToolExecution::ok(serde_json::json!({"wrote": "file.rs"}), 12);
    assert!(!result.is_error);
    assert!(result.effects.is_empty());
    assert_eq!(result.duration_ms, 12);
}

#[test]
fn error_execution_wraps_message_and_flags_is_error() {
    let result = ToolExecution::error("permission denied", 3);
    assert!(result.is_error);
    assert_eq!(result.output["error"], "permission denied");
}

#[test]
fn with_effects_attaches_workflow_effects() {
    let effect = WorkflowEffect::SignalEvent { target_hat: None };
    let result = ToolExecution::ok(serde_json::json!({}), 1).with_effects(vec![effect.clone()]);
    assert_eq!(result.effects, vec![effect]);
}
