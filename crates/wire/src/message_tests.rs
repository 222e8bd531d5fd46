// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;

#[test]
fn envelope_serializes_as_type_payload_sent_at() {
    let message = Message::new(
        MessagePayload::Ping {},
        1_700_000_000_000,
    );
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["type"], "ping");
    assert_eq!(value["payload"], serde_json::json!({}));
    assert_eq!(value["sent_at_ms"], 1_700_000_000_000u64);
}

#[test]
fn type_name_matches_serialized_tag() {
    let message = Message::new(MessagePayload::ShutdownAck {}, 0);
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["type"], message.type_name());
}

#[test]
fn dispatch_round_trips_with_embedded_objective() {
    let objective = hqw_core::Objective::builder().build();
    let message = Message::new(
        MessagePayload::Dispatch {
            objective: objective.clone(),
            sync: SyncConfig::default(),
            dispatched_at_ms: 42,
        },
        42,
    );

    let encoded = serde_json::to_string(&message).unwrap();
    let decoded: Message = serde_json::from_str(&encoded).unwrap();
    match decoded.payload {
        MessagePayload::Dispatch { objective: decoded_objective, .. } => {
            assert_eq!(decoded_objective, objective);
        }
        other => panic!("expected Dispatch, got {other:?}"),
    }
}

#[test]
fn sync_config_defaults_match_spec() {
    let sync = SyncConfig::default();
    assert_eq!(sync.activity_interval_sec, 30);
    assert_eq!(sync.heartbeat_interval_sec, 10);
}

#[test]
fn heartbeat_with_no_active_objective_omits_ids() {
    let message = Message::new(
        MessagePayload::Heartbeat {
            worker_id: WorkerId::new("w1"),
            state: WorkerState::Idle,
            objective_id: None,
            session_id: None,
            iteration: 0,
            tokens_input: 0,
            tokens_output: 0,
            uptime_secs: 5,
        },
        0,
    );
    let value = serde_json::to_value(&message).unwrap();
    assert!(value["payload"]["objective_id"].is_null());
}
