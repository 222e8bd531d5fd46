// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;

#[test]
fn signal_event_round_trips_through_json() {
    let effect = WorkflowEffect::SignalEvent { target_hat: Some("critic".to_string()) };
    let encoded = serde_json::to_string(&effect).unwrap();
    let decoded: WorkflowEffect = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, effect);
}

#[test]
fn checklist_update_round_trips() {
    let effect = WorkflowEffect::ChecklistUpdate { item: "write tests".to_string(), done: true };
    let encoded = serde_json::to_string(&effect).unwrap();
    let decoded: WorkflowEffect = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, effect);
}
