// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The Connection: `send`/`receive` over any framed byte stream (spec.md §4.2).

use crate::codec::{self, ProtocolError, DEFAULT_MAX_FRAME_LEN};
use crate::message::{Message, MessagePayload, WorkerState};
use hqw_core::{ActivityEvent, ObjectiveId, ReportStatus, SessionId, WorkerId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

/// A length-framed JSON connection over any async byte stream.
///
/// Generic over the reader and writer halves so the same type serves both
/// the stdio transport (subprocess mode) and a TCP/mesh socket split via
/// `tokio::io::split` (mesh mode). A single writer mutex serializes outbound
/// frames (spec.md §4.2); the reader is wrapped the same way so `Connection`
/// can be shared behind an `Arc` even though the protocol only ever has one
/// caller of [`Connection::receive`] at a time.
pub struct Connection<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
    max_frame_len: u32,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader: Mutex::new(reader), writer: Mutex::new(writer), max_frame_len: DEFAULT_MAX_FRAME_LEN }
    }

    pub fn with_max_frame_len(reader: R, writer: W, max_frame_len: u32) -> Self {
        Self { reader: Mutex::new(reader), writer: Mutex::new(writer), max_frame_len }
    }

    /// Block until the next frame arrives and decode it.
    pub async fn receive(&self) -> Result<Message, ProtocolError> {
        let mut reader = self.reader.lock().await;
        let bytes = codec::read_message_capped(&mut *reader, self.max_frame_len).await?;
        codec::decode(&bytes)
    }

    /// Encode and send `payload`, stamped with `sent_at_ms`.
    pub async fn send(&self, payload: MessagePayload, sent_at_ms: u64) -> Result<(), ProtocolError> {
        let message = Message::new(payload, sent_at_ms);
        let bytes = codec::encode(&message)?;
        let mut writer = self.writer.lock().await;
        codec::write_message(&mut *writer, &bytes).await
    }

    pub async fn send_ready(
        &self,
        worker_id: WorkerId,
        version: String,
        public_key: String,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Ready { worker_id, version, public_key }, sent_at_ms).await
    }

    pub async fn send_accepted(
        &self,
        objective_id: ObjectiveId,
        session_id: SessionId,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Accepted { objective_id, session_id }, sent_at_ms).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn send_heartbeat(
        &self,
        worker_id: WorkerId,
        state: WorkerState,
        objective_id: Option<ObjectiveId>,
        session_id: Option<SessionId>,
        iteration: u32,
        tokens_input: u64,
        tokens_output: u64,
        uptime_secs: u64,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(
            MessagePayload::Heartbeat {
                worker_id,
                state,
                objective_id,
                session_id,
                iteration,
                tokens_input,
                tokens_output,
                uptime_secs,
            },
            sent_at_ms,
        )
        .await
    }

    pub async fn send_activity(
        &self,
        objective_id: ObjectiveId,
        session_id: SessionId,
        events: Vec<ActivityEvent>,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Activity { objective_id, session_id, events }, sent_at_ms).await
    }

    pub async fn send_completed(
        &self,
        status: ReportStatus,
        summary: String,
        iterations: u32,
        total_tokens: u64,
        completed_at_ms: u64,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(
            MessagePayload::Completed { status, summary, iterations, total_tokens, completed_at_ms },
            sent_at_ms,
        )
        .await
    }

    pub async fn send_failed(
        &self,
        objective_id: ObjectiveId,
        session_id: SessionId,
        error: String,
        iterations: u32,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Failed { objective_id, session_id, error, iterations }, sent_at_ms).await
    }

    pub async fn send_cancelled(&self, sent_at_ms: u64) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Cancelled {}, sent_at_ms).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn send_crash_report(
        &self,
        worker_id: WorkerId,
        objective_id: ObjectiveId,
        session_id: SessionId,
        hat: hqw_core::Hat,
        iteration: u32,
        tokens_input: u64,
        tokens_output: u64,
        work_dir: std::path::PathBuf,
        crashed_at_ms: u64,
        can_resume: bool,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(
            MessagePayload::CrashReport {
                worker_id,
                objective_id,
                session_id,
                hat,
                iteration,
                tokens_input,
                tokens_output,
                work_dir,
                crashed_at_ms,
                can_resume,
            },
            sent_at_ms,
        )
        .await
    }

    pub async fn send_dispatch(
        &self,
        objective: hqw_core::Objective,
        sync: crate::message::SyncConfig,
        dispatched_at_ms: u64,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Dispatch { objective, sync, dispatched_at_ms }, sent_at_ms).await
    }

    pub async fn send_resume(
        &self,
        session_id: SessionId,
        approved: bool,
        reason: Option<String>,
        encrypted_secrets: Vec<u8>,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Resume { session_id, approved, reason, encrypted_secrets }, sent_at_ms).await
    }

    pub async fn send_cancel(
        &self,
        objective_id: ObjectiveId,
        reason: String,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Cancel { objective_id, reason }, sent_at_ms).await
    }

    pub async fn send_ping(&self, sent_at_ms: u64) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Ping {}, sent_at_ms).await
    }

    pub async fn send_shutdown(&self, sent_at_ms: u64) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Shutdown {}, sent_at_ms).await
    }

    pub async fn send_shutdown_ack(&self, sent_at_ms: u64) -> Result<(), ProtocolError> {
        self.send(MessagePayload::ShutdownAck {}, sent_at_ms).await
    }

    pub async fn send_pong(
        &self,
        worker_id: WorkerId,
        state: WorkerState,
        objective_id: Option<ObjectiveId>,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Pong { worker_id, state, objective_id }, sent_at_ms).await
    }

    pub async fn send_error(&self, code: String, message: String, sent_at_ms: u64) -> Result<(), ProtocolError> {
        self.send(MessagePayload::Error { code, message }, sent_at_ms).await
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
