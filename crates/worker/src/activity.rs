// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Activity Recorder (spec.md §4.4): durably persists every activity event
//! as it happens, then syncs unsynced batches to HQ on a timer. Recording is
//! synchronous and local; syncing is best-effort and resumable, since the
//! local store is itself the source of truth until HQ acks a batch.

use async_trait::async_trait;
use hqw_core::{ActivityEvent, ObjectiveId, SessionId};
use hqw_store::LocalStore;
use hqw_wire::ProtocolError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The send-side of the connection the recorder needs: just enough to push
/// an activity batch. Narrow on purpose so the recorder can be driven by
/// either transport the runner holds (spec.md §4.6).
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn send_activity(
        &self,
        objective_id: ObjectiveId,
        session_id: SessionId,
        events: Vec<ActivityEvent>,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError>;
}

#[async_trait]
impl<R, W> ActivitySink for hqw_wire::Connection<R, W>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    async fn send_activity(
        &self,
        objective_id: ObjectiveId,
        session_id: SessionId,
        events: Vec<ActivityEvent>,
        sent_at_ms: u64,
    ) -> Result<(), ProtocolError> {
        hqw_wire::Connection::send_activity(self, objective_id, session_id, events, sent_at_ms).await
    }
}

/// Records activity for one session: every call to [`ActivityRecorder::record`]
/// persists immediately (spec.md §4.4 "durable then volatile"); a background
/// loop flushes unsynced events to HQ every `activity_interval_sec`.
pub struct ActivityRecorder {
    store: Arc<LocalStore>,
    objective_id: ObjectiveId,
    session_id: SessionId,
}

impl ActivityRecorder {
    pub fn new(store: Arc<LocalStore>, objective_id: ObjectiveId, session_id: SessionId) -> Self {
        Self { store, objective_id, session_id }
    }

    /// Persist `event` to the local store. Infallible from the caller's
    /// perspective at the Ralph Loop call site: a store write failure here
    /// is a [`hqw_store::StoreError`], surfaced to the caller to decide
    /// whether it's fatal (spec.md §7).
    pub fn record(&self, event: ActivityEvent) -> Result<(), hqw_store::StoreError> {
        self.store.append_activity(event)
    }

    /// One sync attempt: drain unsynced events (capped at `batch_limit`),
    /// send them, and mark them synced only on success (spec.md §4.4).
    /// `batch_limit == 0` means no cap.
    pub async fn flush(
        &self,
        sink: &dyn ActivitySink,
        batch_limit: usize,
        now_ms: u64,
    ) -> Result<usize, ProtocolError> {
        let events = self.store.get_unsynced_activity(batch_limit);
        if events.is_empty() {
            return Ok(0);
        }
        let ids: Vec<_> = events.iter().map(|e| e.id).collect();
        sink.send_activity(self.objective_id, self.session_id, events, now_ms).await?;
        if let Err(e) = self.store.mark_activity_synced(&ids) {
            warn!(error = %e, "failed to mark activity synced after a successful send");
        }
        Ok(ids.len())
    }

    /// Drives [`Self::flush`] on a fixed interval until `cancel` fires,
    /// then performs one final flush so nothing unsynced is left behind
    /// (spec.md §4.4 "StopSyncLoop" / §8.3 crash-recovery guarantee).
    pub async fn run_sync_loop<C: hqw_core::Clock>(
        &self,
        sink: &dyn ActivitySink,
        clock: &C,
        interval: Duration,
        batch_limit: usize,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.flush(sink, batch_limit, clock.epoch_ms()).await {
                        Ok(n) if n > 0 => debug!(synced = n, "activity synced"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "activity sync failed, will retry next tick"),
                    }
                }
                _ = cancel.cancelled() => {
                    if let Err(e) = self.flush(sink, batch_limit, clock.epoch_ms()).await {
                        warn!(error = %e, "final activity flush on shutdown failed");
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
