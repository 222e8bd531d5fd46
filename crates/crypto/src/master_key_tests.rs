// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;
use tempfile::tempdir;

#[test]
fn load_or_create_persists_and_reuses_the_same_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("master.key");

    let first = MasterKey::load_or_create(&path).unwrap();
    let second = MasterKey::load_or_create(&path).unwrap();
    assert_eq!(first.0, second.0);
}

#[test]
fn two_fresh_keys_differ() {
    let dir = tempdir().unwrap();
    let a = MasterKey::load_or_create(&dir.path().join("a.key")).unwrap();
    let b = MasterKey::load_or_create(&dir.path().join("b.key")).unwrap();
    assert_ne!(a.0, b.0);
}

#[cfg(unix)]
#[test]
fn master_key_file_is_owner_only_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let path = dir.path().join("master.key");
    MasterKey::load_or_create(&path).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
