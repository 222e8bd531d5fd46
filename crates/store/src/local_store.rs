// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The encrypted local store: key-value slots for the current objective and
//! session, plus an append log of activity events (spec.md §4.3).

use crate::error::StoreError;
use crate::state::StoreState;
use hqw_core::{ActivityEvent, ActivityEventId, Objective, Session, SessionId, SessionStatus};
use hqw_crypto::StoreCipher;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// A single-file encrypted store, process-exclusive (spec.md §5).
///
/// Every mutation rewrites the whole encrypted file to a temp path and
/// renames it over the original, so a crash mid-write never leaves a
/// partially written store: the rename either lands or it doesn't.
pub struct LocalStore {
    path: PathBuf,
    cipher: StoreCipher,
    state: Mutex<StoreState>,
}

impl LocalStore {
    /// Open the store at `path`, decrypting its current contents with
    /// `cipher`. A missing file is treated as a fresh, empty store; any
    /// other I/O or authentication failure is fatal (spec.md §7).
    pub fn open(path: impl Into<PathBuf>, cipher: StoreCipher) -> Result<Self, StoreError> {
        let path = path.into();
        let state = if path.exists() {
            let ciphertext = std::fs::read(&path)?;
            let plaintext = cipher.decrypt(&ciphertext)?;
            serde_json::from_slice(&plaintext)?
        } else {
            StoreState::default()
        };
        Ok(Self { path, cipher, state: Mutex::new(state) })
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(state)?;
        let ciphertext = self.cipher.encrypt(&plaintext)?;

        let tmp_path = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&tmp_path, &ciphertext)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub fn store_objective(&self, objective: Objective) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.objective = Some(objective);
        self.persist(&state)
    }

    pub fn get_objective(&self) -> Option<Objective> {
        self.state.lock().objective.clone()
    }

    /// Idempotent upsert keyed by `session.id` (spec.md §4.3).
    pub fn checkpoint_session(&self, session: Session) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.session = Some(session);
        self.persist(&state)
    }

    /// Returns the session if one is stored with status `running`.
    pub fn get_incomplete_session(&self) -> Option<Session> {
        self.state.lock().session.clone().filter(|s| s.status == SessionStatus::Running)
    }

    pub fn mark_session_complete(
        &self,
        session_id: SessionId,
        outcome: SessionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if let Some(session) = state.session.as_mut() {
            if session.id == session_id {
                session.status = outcome;
            }
        }
        self.persist(&state)
    }

    /// Append `event` with `synced = false` (spec.md §4.3).
    pub fn append_activity(&self, event: ActivityEvent) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.activity.push(crate::state::ActivityRecord { event, synced: false });
        self.persist(&state)
    }

    /// Unsynced events in insertion order; `limit == 0` means no cap.
    pub fn get_unsynced_activity(&self, limit: usize) -> Vec<ActivityEvent> {
        self.state.lock().unsynced(limit)
    }

    /// Flip `synced` for every id in `ids`; atomic across the whole batch.
    pub fn mark_activity_synced(&self, ids: &[ActivityEventId]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.mark_synced(ids);
        self.persist(&state)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "local_store_tests.rs"]
mod tests;
