// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;
use hqw_core::Objective;
use hqw_crypto::BoxKeypair;
use parking_lot::Mutex as PMutex;

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Dispatch { objective_id: ObjectiveId },
    Cancel { objective_id: ObjectiveId, reason: String },
}

#[derive(Default)]
struct FakeWorkerChannel {
    sent: PMutex<Vec<Sent>>,
}

impl FakeWorkerChannel {
    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl WorkerChannel for FakeWorkerChannel {
    async fn send_dispatch(
        &self,
        objective: Objective,
        _sync: SyncConfig,
        _dispatched_at_ms: u64,
        _sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.sent.lock().push(Sent::Dispatch { objective_id: objective.id });
        Ok(())
    }

    async fn send_cancel(&self, objective_id: ObjectiveId, reason: String, _sent_at_ms: u64) -> Result<(), ProtocolError> {
        self.sent.lock().push(Sent::Cancel { objective_id, reason });
        Ok(())
    }

    async fn send_resume(
        &self,
        _session_id: SessionId,
        _approved: bool,
        _reason: Option<String>,
        _encrypted_secrets: Vec<u8>,
        _sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        Ok(())
    }

    async fn send_ping(&self, _sent_at_ms: u64) -> Result<(), ProtocolError> {
        Ok(())
    }

    async fn send_shutdown(&self, _sent_at_ms: u64) -> Result<(), ProtocolError> {
        Ok(())
    }
}

fn register(manager: &WorkerManager, id: &str, last_heartbeat_ms: u64) -> (WorkerId, Arc<FakeWorkerChannel>) {
    let worker_id = WorkerId::new(id);
    let channel = Arc::new(FakeWorkerChannel::default());
    manager.register(worker_id.clone(), channel.clone(), BoxKeypair::generate().public_key(), last_heartbeat_ms);
    (worker_id, channel)
}

#[tokio::test]
async fn dispatch_picks_idle_worker_with_most_recent_heartbeat() {
    let manager = WorkerManager::new();
    let (_older, _older_chan) = register(&manager, "w-older", 100);
    let (newer, newer_chan) = register(&manager, "w-newer", 200);

    let objective = Objective::builder().build();
    let chosen = manager.dispatch(objective, b"{}", SyncConfig::default(), 1_000).await.unwrap();

    assert_eq!(chosen, newer);
    assert_eq!(newer_chan.sent().len(), 1);
    assert_eq!(manager.state_of(&chosen), Some(ManagedWorkerState::Busy));
}

#[tokio::test]
async fn dispatch_with_no_idle_worker_errors() {
    let manager = WorkerManager::new();
    let objective = Objective::builder().build();
    let err = manager.dispatch(objective, b"{}", SyncConfig::default(), 1_000).await.unwrap_err();
    assert!(matches!(err, WorkerManagerError::NoIdleWorker));
}

#[tokio::test]
async fn sweep_stale_workers_surfaces_lost_objective() {
    let manager = WorkerManager::new();
    let (worker_id, _chan) = register(&manager, "w1", 0);
    let objective = Objective::builder().build();
    let objective_id = objective.id;
    manager.dispatch(objective, b"{}", SyncConfig::default(), 0).await.unwrap();
    manager.on_accepted(&worker_id);

    // heartbeat_interval=10s -> stale after 30s of silence.
    let events = manager.sweep_stale_workers(35_000, 10);

    assert_eq!(events, vec![HqEvent::WorkerLost { worker_id: worker_id.clone(), objective_id: Some(objective_id) }]);
    assert_eq!(manager.state_of(&worker_id), Some(ManagedWorkerState::Stale));
}

#[tokio::test]
async fn sweep_stale_workers_is_a_noop_within_the_interval() {
    let manager = WorkerManager::new();
    let (worker_id, _chan) = register(&manager, "w1", 0);
    assert!(manager.sweep_stale_workers(5_000, 10).is_empty());
    assert_eq!(manager.state_of(&worker_id), Some(ManagedWorkerState::Idle));
}

#[tokio::test]
async fn dispatch_timeout_marks_worker_stale_once_deadline_elapses() {
    let manager = WorkerManager::new();
    let (worker_id, _chan) = register(&manager, "w1", 0);
    let objective = Objective::builder().build();
    let objective_id = objective.id;
    manager.dispatch(objective, b"{}", SyncConfig::default(), 0).await.unwrap();

    assert!(manager.check_dispatch_timeouts(1_000).is_empty(), "well within the 30s bound");

    let events = manager.check_dispatch_timeouts(DEFAULT_DISPATCH_TIMEOUT_SECS * 1000);
    assert_eq!(events, vec![HqEvent::DispatchTimedOut { worker_id: worker_id.clone(), objective_id }]);
    assert_eq!(manager.state_of(&worker_id), Some(ManagedWorkerState::Stale));
}

#[tokio::test]
async fn cancel_objective_sends_to_the_owning_worker() {
    let manager = WorkerManager::new();
    let (_worker_id, chan) = register(&manager, "w1", 0);
    let objective = Objective::builder().build();
    let objective_id = objective.id;
    manager.dispatch(objective, b"{}", SyncConfig::default(), 0).await.unwrap();

    manager.cancel_objective(objective_id, "user".to_string(), 10).await.unwrap();

    assert_eq!(chan.sent().last(), Some(&Sent::Cancel { objective_id, reason: "user".to_string() }));
}

#[tokio::test]
async fn cancel_objective_with_no_owner_errors() {
    let manager = WorkerManager::new();
    let err = manager.cancel_objective(ObjectiveId::new(), "user".to_string(), 10).await.unwrap_err();
    assert!(matches!(err, WorkerManagerError::ObjectiveNotAssigned(_)));
}

#[tokio::test]
async fn mark_idle_clears_current_objective() {
    let manager = WorkerManager::new();
    let (worker_id, _chan) = register(&manager, "w1", 0);
    let objective = Objective::builder().build();
    manager.dispatch(objective, b"{}", SyncConfig::default(), 0).await.unwrap();

    manager.mark_idle(&worker_id);

    assert_eq!(manager.state_of(&worker_id), Some(ManagedWorkerState::Idle));
}
