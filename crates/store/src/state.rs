// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The materialized contents of the local store (spec.md §3, §4.3).
//!
//! A worker has at most one in-flight objective and at most one live
//! session for it, so the store holds `Option<Objective>`/`Option<Session>`
//! rather than a map keyed by id.

use hqw_core::{ActivityEvent, ActivityEventId, Objective, Session};
use serde::{Deserialize, Serialize};

/// One activity event plus its sync state against HQ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub event: ActivityEvent,
    pub synced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub objective: Option<Objective>,
    pub session: Option<Session>,
    /// Append-only, insertion order preserved (spec.md §4.4 ordering guarantee).
    pub activity: Vec<ActivityRecord>,
}

impl StoreState {
    pub fn mark_synced(&mut self, ids: &[ActivityEventId]) {
        for record in &mut self.activity {
            if ids.contains(&record.event.id) {
                record.synced = true;
            }
        }
    }

    pub fn unsynced(&self, limit: usize) -> Vec<ActivityEvent> {
        let iter = self.activity.iter().filter(|r| !r.synced).map(|r| r.event.clone());
        if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        }
    }
}
