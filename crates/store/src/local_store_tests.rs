// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;
use hqw_core::{ActivityEvent, Objective, Session, SessionStatus};
use hqw_crypto::MasterKey;
use tempfile::tempdir;

fn cipher() -> StoreCipher {
    StoreCipher::from_master_key(&MasterKey::generate())
}

#[test]
fn opening_a_missing_file_yields_an_empty_store() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("worker.db"), cipher()).unwrap();
    assert!(store.get_objective().is_none());
    assert!(store.get_incomplete_session().is_none());
}

#[test]
fn store_and_get_objective_round_trips() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("worker.db"), cipher()).unwrap();

    let objective = Objective::builder().build();
    store.store_objective(objective.clone()).unwrap();

    assert_eq!(store.get_objective(), Some(objective));
}

#[test]
fn reopening_the_file_restores_prior_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("worker.db");
    let shared_cipher_key = MasterKey::generate();

    let objective = Objective::builder().build();
    {
        let store = LocalStore::open(&path, StoreCipher::from_master_key(&shared_cipher_key)).unwrap();
        store.store_objective(objective.clone()).unwrap();
    }

    let reopened = LocalStore::open(&path, StoreCipher::from_master_key(&shared_cipher_key)).unwrap();
    assert_eq!(reopened.get_objective(), Some(objective));
}

#[test]
fn reopening_with_the_wrong_key_fails_authentication() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("worker.db");

    {
        let store = LocalStore::open(&path, cipher()).unwrap();
        store.store_objective(Objective::builder().build()).unwrap();
    }

    let err = LocalStore::open(&path, cipher()).unwrap_err();
    assert!(matches!(err, StoreError::AuthenticationFailed));
}

#[test]
fn get_incomplete_session_only_returns_running_sessions() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("worker.db"), cipher()).unwrap();

    let session = Session::builder().status(SessionStatus::Running).build();
    store.checkpoint_session(session.clone()).unwrap();
    assert_eq!(store.get_incomplete_session(), Some(session.clone()));

    store.mark_session_complete(session.id, SessionStatus::Completed).unwrap();
    assert!(store.get_incomplete_session().is_none());
}

#[test]
fn checkpoint_session_upsert_is_idempotent_by_id() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("worker.db"), cipher()).unwrap();

    let session = Session::builder().iteration(1).build();
    store.checkpoint_session(session.clone()).unwrap();
    let updated = Session { iteration: 2, ..session.clone() };
    store.checkpoint_session(updated.clone()).unwrap();

    assert_eq!(store.get_incomplete_session(), Some(updated));
}

#[test]
fn append_activity_then_get_unsynced_preserves_insertion_order() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("worker.db"), cipher()).unwrap();

    let a = ActivityEvent::builder().build();
    let b = ActivityEvent::builder().build();
    store.append_activity(a.clone()).unwrap();
    store.append_activity(b.clone()).unwrap();

    let unsynced = store.get_unsynced_activity(0);
    assert_eq!(unsynced, vec![a, b]);
}

#[test]
fn mark_activity_synced_is_atomic_across_the_batch() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("worker.db"), cipher()).unwrap();

    let a = ActivityEvent::builder().build();
    let b = ActivityEvent::builder().build();
    let c = ActivityEvent::builder().build();
    store.append_activity(a.clone()).unwrap();
    store.append_activity(b.clone()).unwrap();
    store.append_activity(c.clone()).unwrap();

    store.mark_activity_synced(&[a.id, b.id]).unwrap();

    assert_eq!(store.get_unsynced_activity(0), vec![c]);
}

#[test]
fn get_unsynced_activity_respects_limit() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("worker.db"), cipher()).unwrap();

    for _ in 0..5 {
        store.append_activity(ActivityEvent::builder().build()).unwrap();
    }

    assert_eq!(store.get_unsynced_activity(2).len(), 2);
}
