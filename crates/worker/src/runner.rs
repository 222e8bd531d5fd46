// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The Worker Runner (spec.md §4.6): the single-threaded dispatcher over
//! one inbound connection, plus the boot sequence and heartbeat snapshot it
//! needs to drive. One [`Slot`] mutex holds everything the heartbeat ticker
//! and the message handler both read.

use crate::activity::ActivityRecorder;
use crate::error::{BootError, RunnerError};
use crate::ralph::RalphLoop;
use hqw_adapters::{LlmClient, ToolExecutor, WorktreeManager};
use hqw_core::{
    Clock, Objective, ObjectiveId, Report, ReportStatus, Scratchpad, Secrets, Session, SessionId, SessionStatus,
    WorkerId,
};
use hqw_crypto::WorkerIdentity;
use hqw_store::LocalStore;
use hqw_wire::{Connection, MessagePayload, SyncConfig, WorkerState};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What the runner's current slot holds (spec.md §4.6: "current objective /
/// current session / current cancel" under one mutex).
enum Slot {
    Idle,
    Busy {
        objective_id: ObjectiveId,
        session_id: SessionId,
        iteration: u32,
        tokens_input: u64,
        tokens_output: u64,
        cancel: CancellationToken,
    },
}

/// A heartbeat snapshot taken under the state lock (spec.md §4.6).
pub struct HeartbeatSnapshot {
    pub state: WorkerState,
    pub objective_id: Option<ObjectiveId>,
    pub session_id: Option<SessionId>,
    pub iteration: u32,
    pub tokens_input: u64,
    pub tokens_output: u64,
}

pub struct WorkerRunner<C: Clock> {
    identity: WorkerIdentity,
    store: Arc<LocalStore>,
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolExecutor>,
    worktree: Arc<dyn WorktreeManager>,
    clock: C,
    started_at_ms: u64,
    slot: Mutex<Slot>,
}

/// Where a worktree is created from, standing in for the local clone of
/// `ProjectRef::clone_url` that a repo-management collaborator would
/// maintain (spec.md §1 Non-goals: the git-worktree toolchain is assumed to
/// exist, not built here).
fn repo_root(objective: &Objective) -> PathBuf {
    PathBuf::from("/var/lib/hqw-worker/repos").join(&objective.project.name)
}

impl<C: Clock> WorkerRunner<C> {
    pub fn new(
        identity: WorkerIdentity,
        store: Arc<LocalStore>,
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolExecutor>,
        worktree: Arc<dyn WorktreeManager>,
        clock: C,
    ) -> Self {
        let started_at_ms = clock.epoch_ms();
        Self { identity, store, llm, tools, worktree, clock, started_at_ms, slot: Mutex::new(Slot::Idle) }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.identity.worker_id.clone()
    }

    /// Boot sequence (spec.md §4.6): send `ready`, then if an incomplete
    /// session was left behind, send `crash_report`; finally flush any
    /// unsynced activity for the session the store is still holding.
    pub async fn boot<R, W>(&self, conn: &Connection<R, W>, version: String) -> Result<(), BootError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let now_ms = self.clock.epoch_ms();
        conn.send_ready(self.worker_id(), version, self.identity.box_public_key().to_base64(), now_ms).await?;

        if let Some(session) = self.store.get_incomplete_session() {
            let can_resume = !session.conversation.is_empty();
            conn.send_crash_report(
                self.worker_id(),
                session.objective_id,
                session.id,
                session.hat,
                session.iteration,
                session.tokens_input,
                session.tokens_output,
                session.work_dir.clone(),
                self.clock.epoch_ms(),
                can_resume,
                self.clock.epoch_ms(),
            )
            .await?;

            self.flush_unsynced_activity(conn, session.objective_id, session.id).await;
        }

        Ok(())
    }

    /// Flush every unsynced activity event for the session currently held
    /// in the store (spec.md §4.6 step 4). The local store is single-slot
    /// (one objective, one session at a time), so there is exactly one
    /// batch to send, not one per objective.
    async fn flush_unsynced_activity<R, W>(&self, conn: &Connection<R, W>, objective_id: ObjectiveId, session_id: SessionId)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let events = self.store.get_unsynced_activity(0);
        if events.is_empty() {
            return;
        }
        let ids: Vec<_> = events.iter().map(|e| e.id).collect();
        match conn.send_activity(objective_id, session_id, events, self.clock.epoch_ms()).await {
            Ok(()) => {
                if let Err(e) = self.store.mark_activity_synced(&ids) {
                    warn!(error = %e, "failed to mark boot-time activity synced");
                }
            }
            Err(e) => warn!(error = %e, "failed to flush unsynced activity at boot"),
        }
    }

    /// Snapshot the current slot for a heartbeat or `pong` (spec.md §4.6).
    pub fn snapshot(&self) -> HeartbeatSnapshot {
        match &*self.slot.lock() {
            Slot::Idle => HeartbeatSnapshot {
                state: WorkerState::Idle,
                objective_id: None,
                session_id: None,
                iteration: 0,
                tokens_input: 0,
                tokens_output: 0,
            },
            Slot::Busy { objective_id, session_id, iteration, tokens_input, tokens_output, .. } => HeartbeatSnapshot {
                state: WorkerState::Busy,
                objective_id: Some(*objective_id),
                session_id: Some(*session_id),
                iteration: *iteration,
                tokens_input: *tokens_input,
                tokens_output: *tokens_output,
            },
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.clock.epoch_ms().saturating_sub(self.started_at_ms) / 1000
    }

    fn is_busy(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Busy { .. })
    }

    /// `ping` handling: reply `pong` under the state lock (spec.md §4.6).
    pub async fn handle_ping<R, W>(&self, conn: &Connection<R, W>) -> Result<(), RunnerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let snapshot = self.snapshot();
        conn.send_pong(self.worker_id(), snapshot.state, snapshot.objective_id, self.clock.epoch_ms())
            .await
            .map_err(RunnerError::from)
    }

    /// `cancel` handling: cancel the running loop's token. Does not itself
    /// release the slot — the run loop's exit path does (spec.md §4.6).
    pub fn handle_cancel(&self, objective_id: ObjectiveId) {
        if let Slot::Busy { objective_id: running, cancel, .. } = &*self.slot.lock() {
            if *running == objective_id {
                cancel.cancel();
            }
        }
    }

    /// `shutdown` handling: cancel whatever is running and reply
    /// `shutdown_ack` (spec.md §4.6). The caller exits the process after.
    pub async fn handle_shutdown<R, W>(&self, conn: &Connection<R, W>) -> Result<(), RunnerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if let Slot::Busy { cancel, .. } = &*self.slot.lock() {
            cancel.cancel();
        }
        conn.send_shutdown_ack(self.clock.epoch_ms()).await.map_err(RunnerError::from)
    }

    /// `dispatch` handling (spec.md §4.6): decrypt secrets, create a
    /// work_dir, create a session, and drive the Ralph Loop to completion.
    /// Runs the whole objective inline; callers that want the read loop
    /// free during execution should spawn this call as its own task.
    pub async fn handle_dispatch<R, W>(
        self: &Arc<Self>,
        conn: &Arc<Connection<R, W>>,
        objective: Objective,
        sync: SyncConfig,
    ) -> Result<(), RunnerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if self.is_busy() {
            conn.send_error(
                "busy".to_string(),
                "worker is already running an objective".to_string(),
                self.clock.epoch_ms(),
            )
            .await?;
            return Err(RunnerError::Busy);
        }

        self.decrypt_secrets(&objective)?;

        let work_dir = match self
            .worktree
            .create(&repo_root(&objective), &format!("objective/{}", objective.id.as_str()), &objective.base_branch)
            .await
        {
            Ok(handle) => handle.path,
            Err(e) => {
                conn.send_error("workdir_missing".to_string(), e.to_string(), self.clock.epoch_ms()).await?;
                return Err(RunnerError::WorkdirMissing);
            }
        };

        let session = Session {
            id: SessionId::new(),
            objective_id: objective.id,
            hat: objective.hat,
            work_dir,
            iteration: 0,
            tokens_input: 0,
            tokens_output: 0,
            conversation: Vec::new(),
            scratchpad: Scratchpad::default(),
            started_at_ms: self.clock.epoch_ms(),
            last_checkpoint_at_ms: 0,
            status: SessionStatus::Running,
            consecutive_checkpoint_failures: 0,
        };
        self.store.store_objective(objective.clone())?;
        self.store.checkpoint_session(session.clone())?;

        let cancel = self.occupy_slot(&objective, &session);
        conn.send_accepted(objective.id, session.id, self.clock.epoch_ms()).await?;

        let work_dir = session.work_dir.clone();
        let report = self.run_session(conn, session, &objective, sync, cancel).await;
        self.finish(conn, &objective, report, &work_dir).await
    }

    /// `resume` handling (spec.md §4.6). `approved = false` declines the
    /// crashed session; `approved = true` restores it from checkpoint.
    pub async fn handle_resume<R, W>(
        self: &Arc<Self>,
        conn: &Arc<Connection<R, W>>,
        session_id: SessionId,
        approved: bool,
        encrypted_secrets: Vec<u8>,
    ) -> Result<(), RunnerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Some(mut session) = self.store.get_incomplete_session().filter(|s| s.id == session_id) else {
            conn.send_error(
                "no_session_to_resume".to_string(),
                format!("no crashed session {} held on boot", session_id.as_str()),
                self.clock.epoch_ms(),
            )
            .await?;
            return Err(RunnerError::NoSessionToResume);
        };

        if !approved {
            self.store.mark_session_complete(session_id, SessionStatus::Declined)?;
            return Ok(());
        }

        if !session.work_dir.exists() {
            conn.send_error("workdir_missing".to_string(), "resume work_dir is gone".to_string(), self.clock.epoch_ms())
                .await?;
            return Err(RunnerError::WorkdirMissing);
        }

        let Some(mut objective) = self.store.get_objective().filter(|o| o.id == session.objective_id) else {
            conn.send_error(
                "no_session_to_resume".to_string(),
                "objective for resumed session not found".to_string(),
                self.clock.epoch_ms(),
            )
            .await?;
            return Err(RunnerError::NoSessionToResume);
        };
        objective.encrypted_secrets = encrypted_secrets;
        self.decrypt_secrets(&objective)?;

        session.status = SessionStatus::Running;
        let cancel = self.occupy_slot(&objective, &session);
        conn.send_accepted(objective.id, session.id, self.clock.epoch_ms()).await?;

        let work_dir = session.work_dir.clone();
        let report = self.run_session(conn, session, &objective, SyncConfig::default(), cancel).await;
        self.finish(conn, &objective, report, &work_dir).await
    }

    fn occupy_slot(&self, objective: &Objective, session: &Session) -> CancellationToken {
        let cancel = CancellationToken::new();
        *self.slot.lock() = Slot::Busy {
            objective_id: objective.id,
            session_id: session.id,
            iteration: session.iteration,
            tokens_input: session.tokens_input,
            tokens_output: session.tokens_output,
            cancel: cancel.clone(),
        };
        cancel
    }

    fn decrypt_secrets(&self, objective: &Objective) -> Result<Secrets, RunnerError> {
        let plaintext =
            self.identity.open_secrets(&objective.encrypted_secrets).map_err(|_| RunnerError::DecryptFailed)?;
        serde_json::from_slice(&plaintext).map_err(|_| RunnerError::DecryptFailed)
    }

    /// Runs the Ralph Loop and its own activity sync goroutine side by side
    /// (spec.md §4.4, §4.6, §5): the sync loop ticks independently of loop
    /// iterations and gets one final flush once the loop returns, so
    /// nothing the loop recorded is left unsynced longer than necessary.
    async fn run_session<R, W>(
        &self,
        conn: &Arc<Connection<R, W>>,
        session: Session,
        objective: &Objective,
        sync: SyncConfig,
        cancel: CancellationToken,
    ) -> Report
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let recorder = Arc::new(ActivityRecorder::new(self.store.clone(), objective.id, session.id));
        let ralph = RalphLoop::new(self.llm.clone(), self.tools.clone(), self.store.clone(), self.clock.clone());
        info!(objective_id = %objective.id.as_str(), session_id = %session.id.as_str(), "starting ralph loop");

        let sync_stop = CancellationToken::new();
        let sync_handle = {
            let recorder = recorder.clone();
            let conn = conn.clone();
            let clock = self.clock.clone();
            let sync_stop = sync_stop.clone();
            let interval = std::time::Duration::from_secs(sync.activity_interval_sec.max(1));
            tokio::spawn(async move {
                recorder.run_sync_loop(conn.as_ref(), &clock, interval, 0, sync_stop).await;
            })
        };

        let report = ralph.run(session, objective, &recorder, cancel).await;
        sync_stop.cancel();
        if let Err(e) = sync_handle.await {
            warn!(error = %e, "activity sync task panicked");
        }
        report
    }

    /// Send the terminal outcome, clean up the work_dir on success only,
    /// and release the slot (spec.md §4.6: "best-effort cleanup of
    /// work_dir only on `completed`").
    async fn finish<R, W>(
        &self,
        conn: &Connection<R, W>,
        objective: &Objective,
        report: Report,
        work_dir: &std::path::Path,
    ) -> Result<(), RunnerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let session_id = match &*self.slot.lock() {
            Slot::Busy { session_id, .. } => *session_id,
            Slot::Idle => SessionId::new(),
        };

        let send_result = match report.status {
            ReportStatus::Completed | ReportStatus::BudgetExceeded => {
                conn.send_completed(
                    report.status,
                    report.summary.clone(),
                    report.iterations,
                    report.total_tokens,
                    report.completed_at_ms,
                    self.clock.epoch_ms(),
                )
                .await
            }
            ReportStatus::Failed => {
                conn.send_failed(objective.id, session_id, report.summary.clone(), report.iterations, self.clock.epoch_ms())
                    .await
            }
            ReportStatus::Cancelled => conn.send_cancelled(self.clock.epoch_ms()).await,
        };

        if matches!(report.status, ReportStatus::Completed) {
            if let Err(e) = self.worktree.remove(work_dir).await {
                warn!(error = %e, "best-effort work_dir cleanup failed");
            }
        }

        *self.slot.lock() = Slot::Idle;
        send_result.map_err(RunnerError::from)
    }

    /// Top-level message dispatch (spec.md §4.6). Returns `true` if the
    /// caller should exit the process after this message (i.e. `shutdown`).
    ///
    /// `dispatch`/`resume` are handed off to their own task rather than
    /// awaited inline: the Ralph Loop runs on its own task so the
    /// connection's read loop stays free to observe `cancel`/`ping`/
    /// `shutdown` while an objective is in flight (spec.md §5).
    pub async fn handle_message<R, W>(self: &Arc<Self>, conn: &Arc<Connection<R, W>>, payload: MessagePayload) -> Result<bool, RunnerError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        match payload {
            MessagePayload::Dispatch { objective, sync, .. } => {
                let runner = self.clone();
                let conn = conn.clone();
                tokio::spawn(async move {
                    if let Err(e) = runner.handle_dispatch(&conn, objective, sync).await {
                        warn!(error = %e, "dispatch run ended in error");
                    }
                });
                Ok(false)
            }
            MessagePayload::Resume { session_id, approved, encrypted_secrets, .. } => {
                let runner = self.clone();
                let conn = conn.clone();
                tokio::spawn(async move {
                    if let Err(e) = runner.handle_resume(&conn, session_id, approved, encrypted_secrets).await {
                        warn!(error = %e, "resume run ended in error");
                    }
                });
                Ok(false)
            }
            MessagePayload::Cancel { objective_id, .. } => {
                self.handle_cancel(objective_id);
                Ok(false)
            }
            MessagePayload::Ping {} => {
                self.handle_ping(conn).await?;
                Ok(false)
            }
            MessagePayload::Shutdown {} => {
                self.handle_shutdown(conn).await?;
                Ok(true)
            }
            _ => {
                warn!("received a message type the worker does not accept");
                conn.send_error(
                    "unknown_message_type".to_string(),
                    "worker does not accept this message type".to_string(),
                    self.clock.epoch_ms(),
                )
                .await?;
                Err(RunnerError::UnknownMessageType)
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
