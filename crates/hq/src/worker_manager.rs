// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Worker Manager: HQ's registry of live workers, dispatch, and cancellation
//! (spec.md §4.9).

use crate::events::HqEvent;
use async_trait::async_trait;
use hqw_core::{Objective, ObjectiveId, SessionId};
use hqw_crypto::BoxPublicKey;
use hqw_wire::{ProtocolError, SyncConfig};
use hqw_core::WorkerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Default bound for `dispatch -> accepted` (spec.md §5).
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;

/// HQ's view of a worker's liveness/assignment state (spec.md §4.9). Distinct
/// from `hqw_wire::WorkerState`, which is the worker's self-reported
/// idle/busy summary on the wire; this also tracks `stale`, which is an HQ
/// judgment call, never sent by the worker itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedWorkerState {
    Idle,
    Busy,
    Stale,
}

/// The narrow send-side of a `Connection<R, W>` the Worker Manager needs.
/// Abstracting over this (instead of holding `Connection<R, W>` directly)
/// lets `WorkerManager` store workers of different transports (stdio
/// subprocess vs. mesh `TcpStream`) in one map, mirroring the teacher's
/// `AgentAdapter` trait-object pattern for heterogeneous backends.
#[async_trait]
pub trait WorkerChannel: Send + Sync {
    async fn send_dispatch(
        &self,
        objective: Objective,
        sync: SyncConfig,
        dispatched_at_ms: u64,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError>;

    async fn send_cancel(&self, objective_id: ObjectiveId, reason: String, sent_at_ms: u64) -> Result<(), ProtocolError>;

    async fn send_resume(
        &self,
        session_id: SessionId,
        approved: bool,
        reason: Option<String>,
        encrypted_secrets: Vec<u8>,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError>;

    async fn send_ping(&self, sent_at_ms: u64) -> Result<(), ProtocolError>;

    async fn send_shutdown(&self, sent_at_ms: u64) -> Result<(), ProtocolError>;
}

#[async_trait]
impl<R, W> WorkerChannel for hqw_wire::Connection<R, W>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    async fn send_dispatch(
        &self,
        objective: Objective,
        sync: SyncConfig,
        dispatched_at_ms: u64,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        hqw_wire::Connection::send_dispatch(self, objective, sync, dispatched_at_ms, sent_at_ms).await
    }

    async fn send_cancel(&self, objective_id: ObjectiveId, reason: String, sent_at_ms: u64) -> Result<(), ProtocolError> {
        hqw_wire::Connection::send_cancel(self, objective_id, reason, sent_at_ms).await
    }

    async fn send_resume(
        &self,
        session_id: SessionId,
        approved: bool,
        reason: Option<String>,
        encrypted_secrets: Vec<u8>,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        hqw_wire::Connection::send_resume(self, session_id, approved, reason, encrypted_secrets, sent_at_ms).await
    }

    async fn send_ping(&self, sent_at_ms: u64) -> Result<(), ProtocolError> {
        hqw_wire::Connection::send_ping(self, sent_at_ms).await
    }

    async fn send_shutdown(&self, sent_at_ms: u64) -> Result<(), ProtocolError> {
        hqw_wire::Connection::send_shutdown(self, sent_at_ms).await
    }
}

struct WorkerHandle {
    public_key: BoxPublicKey,
    state: ManagedWorkerState,
    last_heartbeat_ms: u64,
    current_objective: Option<ObjectiveId>,
    channel: Arc<dyn WorkerChannel>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerManagerError {
    #[error("worker {0} is not registered")]
    UnknownWorker(WorkerId),
    #[error("no idle worker is available to dispatch to")]
    NoIdleWorker,
    #[error("no worker is currently running objective {0:?}")]
    ObjectiveNotAssigned(ObjectiveId),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Crypto(#[from] hqw_crypto::CryptoError),
}

/// Registry of live workers and the dispatch/cancel/heartbeat operations
/// spec.md §4.9 describes. All mutable state lives behind one internal
/// mutex (spec.md §5 "Scheduler heap and running map share one mutex" —
/// applied here to the worker table in the same spirit).
#[derive(Default)]
pub struct WorkerManager {
    workers: Mutex<HashMap<WorkerId, WorkerHandle>>,
    pending_accept: Mutex<HashMap<WorkerId, (ObjectiveId, u64)>>,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Register(worker_id, conn, public_key)` on receiving `ready` (spec.md §4.9).
    pub fn register(&self, worker_id: WorkerId, channel: Arc<dyn WorkerChannel>, public_key: BoxPublicKey, now_ms: u64) {
        self.workers.lock().insert(
            worker_id,
            WorkerHandle { public_key, state: ManagedWorkerState::Idle, last_heartbeat_ms: now_ms, current_objective: None, channel },
        );
    }

    pub fn is_registered(&self, worker_id: &WorkerId) -> bool {
        self.workers.lock().contains_key(worker_id)
    }

    pub fn state_of(&self, worker_id: &WorkerId) -> Option<ManagedWorkerState> {
        self.workers.lock().get(worker_id).map(|w| w.state)
    }

    /// Updates liveness on any inbound `heartbeat` (spec.md §4.9).
    pub fn heartbeat(&self, worker_id: &WorkerId, now_ms: u64) {
        if let Some(handle) = self.workers.lock().get_mut(worker_id) {
            handle.last_heartbeat_ms = now_ms;
        }
    }

    /// Marks workers stale once they miss `heartbeat_interval_secs * 3`
    /// consecutive beats, surfacing any objective they were running so HQ
    /// may reassign it (spec.md §4.9).
    pub fn sweep_stale_workers(&self, now_ms: u64, heartbeat_interval_secs: u64) -> Vec<HqEvent> {
        let stale_after_ms = heartbeat_interval_secs.saturating_mul(3).saturating_mul(1000);
        let mut events = Vec::new();
        let mut workers = self.workers.lock();
        for (worker_id, handle) in workers.iter_mut() {
            if handle.state == ManagedWorkerState::Stale {
                continue;
            }
            if now_ms.saturating_sub(handle.last_heartbeat_ms) >= stale_after_ms {
                handle.state = ManagedWorkerState::Stale;
                let objective_id = handle.current_objective.take();
                events.push(HqEvent::WorkerLost { worker_id: worker_id.clone(), objective_id });
            }
        }
        events
    }

    /// `Dispatch(objective)`: select an idle worker (most recent heartbeat
    /// wins as a tiebreak), seal `secrets_plaintext` to its public key, send
    /// `dispatch`. The caller observes `accepted` on the read loop and calls
    /// [`WorkerManager::on_accepted`]; [`WorkerManager::check_dispatch_timeouts`]
    /// handles the 30s bound (spec.md §4.9, §5).
    pub async fn dispatch(
        &self,
        mut objective: Objective,
        secrets_plaintext: &[u8],
        sync: SyncConfig,
        now_ms: u64,
    ) -> Result<WorkerId, WorkerManagerError> {
        let (worker_id, public_key, channel) = {
            let workers = self.workers.lock();
            let chosen = workers
                .iter()
                .filter(|(_, w)| w.state == ManagedWorkerState::Idle)
                .max_by_key(|(_, w)| w.last_heartbeat_ms)
                .map(|(id, w)| (id.clone(), w.public_key.clone(), w.channel.clone()));
            chosen.ok_or(WorkerManagerError::NoIdleWorker)?
        };

        let sealed = public_key.seal(secrets_plaintext)?;
        objective.encrypted_secrets = sealed;
        let objective_id = objective.id;

        channel.send_dispatch(objective, sync, now_ms, now_ms).await?;

        {
            let mut workers = self.workers.lock();
            if let Some(handle) = workers.get_mut(&worker_id) {
                handle.state = ManagedWorkerState::Busy;
                handle.current_objective = Some(objective_id);
            }
        }
        self.pending_accept.lock().insert(worker_id.clone(), (objective_id, now_ms + DEFAULT_DISPATCH_TIMEOUT_SECS * 1000));

        Ok(worker_id)
    }

    /// Clears the pending-accept deadline once `accepted` arrives.
    pub fn on_accepted(&self, worker_id: &WorkerId) {
        self.pending_accept.lock().remove(worker_id);
    }

    /// Marks any worker whose `accepted` did not arrive by its deadline as
    /// stale (spec.md §4.9 "on timeout the worker is marked `stale`").
    pub fn check_dispatch_timeouts(&self, now_ms: u64) -> Vec<HqEvent> {
        let mut pending = self.pending_accept.lock();
        let mut workers = self.workers.lock();
        let mut events = Vec::new();
        pending.retain(|worker_id, &mut (objective_id, deadline_ms)| {
            if now_ms < deadline_ms {
                return true;
            }
            if let Some(handle) = workers.get_mut(worker_id) {
                handle.state = ManagedWorkerState::Stale;
                handle.current_objective = None;
            }
            events.push(HqEvent::DispatchTimedOut { worker_id: worker_id.clone(), objective_id });
            false
        });
        events
    }

    /// `CancelObjective(objective_id)`: find the owning worker and send
    /// `cancel{objective_id, reason}` (spec.md §4.9). The terminal
    /// `cancelled`/`failed` arrives asynchronously on the read loop.
    pub async fn cancel_objective(&self, objective_id: ObjectiveId, reason: String, now_ms: u64) -> Result<(), WorkerManagerError> {
        let channel = {
            let workers = self.workers.lock();
            workers
                .iter()
                .find(|(_, w)| w.current_objective == Some(objective_id))
                .map(|(_, w)| w.channel.clone())
                .ok_or(WorkerManagerError::ObjectiveNotAssigned(objective_id))?
        };
        channel.send_cancel(objective_id, reason, now_ms).await?;
        Ok(())
    }

    /// Marks a worker idle again once its current objective reaches a
    /// terminal state (`completed`/`failed`/`cancelled`).
    pub fn mark_idle(&self, worker_id: &WorkerId) {
        if let Some(handle) = self.workers.lock().get_mut(worker_id) {
            handle.state = ManagedWorkerState::Idle;
            handle.current_objective = None;
        }
    }
}

#[cfg(test)]
#[path = "worker_manager_tests.rs"]
mod tests;
