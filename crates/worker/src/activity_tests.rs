// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;
use hqw_core::{ActivityEvent, ActivityKind, FakeClock, ObjectiveId, SessionId};
use hqw_crypto::{MasterKey, StoreCipher};
use parking_lot::Mutex as PLMutex;
use std::sync::Arc;
use tempfile::tempdir;

fn store() -> Arc<LocalStore> {
    let dir = tempdir().unwrap();
    let cipher = StoreCipher::from_master_key(&MasterKey::generate());
    Arc::new(LocalStore::open(dir.path().join("worker.db"), cipher).unwrap())
}

fn event(session_id: SessionId, n: u32) -> ActivityEvent {
    ActivityEvent::builder()
        .session_id(session_id)
        .kind(ActivityKind::Status { message: format!("step {n}") })
        .iteration(n)
        .build()
}

struct RecordingSink {
    sent: PLMutex<Vec<Vec<ActivityEvent>>>,
    fail_next: PLMutex<bool>,
}

impl RecordingSink {
    fn new() -> Self {
        Self { sent: PLMutex::new(Vec::new()), fail_next: PLMutex::new(false) }
    }
}

#[async_trait]
impl ActivitySink for RecordingSink {
    async fn send_activity(
        &self,
        _objective_id: ObjectiveId,
        _session_id: SessionId,
        events: Vec<ActivityEvent>,
        _sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        if *self.fail_next.lock() {
            *self.fail_next.lock() = false;
            return Err(ProtocolError::FrameTooLarge { len: 0, max: 0 });
        }
        self.sent.lock().push(events);
        Ok(())
    }
}

#[tokio::test]
async fn record_then_flush_sends_and_marks_synced() {
    let store = store();
    let session_id = SessionId::new();
    let objective_id = ObjectiveId::new();
    let recorder = ActivityRecorder::new(store.clone(), objective_id, session_id);
    recorder.record(event(session_id, 1)).unwrap();
    recorder.record(event(session_id, 2)).unwrap();

    let sink = RecordingSink::new();
    let sent = recorder.flush(&sink, 0, 1_000).await.unwrap();
    assert_eq!(sent, 2);
    assert_eq!(sink.sent.lock().len(), 1);
    assert_eq!(sink.sent.lock()[0].len(), 2);

    assert!(store.get_unsynced_activity(0).is_empty());
}

#[tokio::test]
async fn flush_with_no_unsynced_events_is_a_noop() {
    let store = store();
    let recorder = ActivityRecorder::new(store, ObjectiveId::new(), SessionId::new());
    let sink = RecordingSink::new();
    let sent = recorder.flush(&sink, 0, 1_000).await.unwrap();
    assert_eq!(sent, 0);
    assert!(sink.sent.lock().is_empty());
}

#[tokio::test]
async fn failed_flush_leaves_events_unsynced_for_retry() {
    let store = store();
    let session_id = SessionId::new();
    let recorder = ActivityRecorder::new(store.clone(), ObjectiveId::new(), session_id);
    recorder.record(event(session_id, 1)).unwrap();

    let sink = RecordingSink::new();
    *sink.fail_next.lock() = true;
    let result = recorder.flush(&sink, 0, 1_000).await;
    assert!(result.is_err());
    assert_eq!(store.get_unsynced_activity(0).len(), 1);
}

#[tokio::test]
async fn flush_respects_batch_limit() {
    let store = store();
    let session_id = SessionId::new();
    let recorder = ActivityRecorder::new(store.clone(), ObjectiveId::new(), session_id);
    for i in 0..5 {
        recorder.record(event(session_id, i)).unwrap();
    }

    let sink = RecordingSink::new();
    let sent = recorder.flush(&sink, 2, 1_000).await.unwrap();
    assert_eq!(sent, 2);
    assert_eq!(store.get_unsynced_activity(0).len(), 3);
}

#[tokio::test]
async fn sync_loop_flushes_once_more_on_cancellation() {
    let store = store();
    let session_id = SessionId::new();
    let recorder = ActivityRecorder::new(store.clone(), ObjectiveId::new(), session_id);
    recorder.record(event(session_id, 1)).unwrap();

    let sink = RecordingSink::new();
    let clock = FakeClock::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    recorder
        .run_sync_loop(&sink, &clock, Duration::from_secs(30), 0, cancel)
        .await;

    assert_eq!(sink.sent.lock().len(), 1);
    assert!(store.get_unsynced_activity(0).is_empty());
}
