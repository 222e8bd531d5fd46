// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use std::collections::HashMap;

crate::define_id! {
    pub struct TestId("tst-");
}

#[test]
fn define_id_hash_map_lookup() {
    let id = TestId::new();
    let mut map = HashMap::new();
    map.insert(id, 42);
    assert_eq!(map.get(id.as_str()), Some(&42));
}

#[test]
fn define_id_round_trips_through_string() {
    let id = TestId::new();
    let parsed = TestId::from_string(id.as_str());
    assert_eq!(id, parsed);
}

#[test]
fn define_id_has_expected_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), crate::id::ID_MAX_LEN);
}

#[test]
fn define_id_suffix_strips_prefix() {
    let id = TestId::new();
    assert_eq!(format!("tst-{}", id.suffix()), id.as_str());
}

#[test]
fn define_id_short_truncates() {
    let id = TestId::new();
    assert_eq!(id.short(4).len(), 4);
}

#[test]
fn define_id_serde_round_trip() {
    let id = TestId::new();
    let json = serde_json::to_string(&id).unwrap();
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn define_id_two_generated_ids_differ() {
    assert_ne!(TestId::new(), TestId::new());
}
