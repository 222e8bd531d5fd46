// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

use super::*;

#[test]
fn builder_produces_unique_ids() {
    let a = Objective::builder().build();
    let b = Objective::builder().build();
    assert_ne!(a.id, b.id);
}

#[test]
fn secrets_round_trip_preserves_unknown_fields() {
    let json = serde_json::json!({
        "anthropic_key": "sk-ant-1",
        "github_token": "ghp-1",
        "future_field": "keep-me",
    });
    let secrets: Secrets = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(secrets.extra.get("future_field").unwrap(), "keep-me");
    let back = serde_json::to_value(&secrets).unwrap();
    assert_eq!(back.get("future_field").unwrap(), "keep-me");
}

#[test]
fn project_id_matches_embedded_project() {
    let objective = Objective::builder().build();
    assert_eq!(objective.project_id(), objective.project.id);
}

#[test]
fn missing_budget_fields_deserialize_to_defaults() {
    let json = serde_json::json!({
        "id": "obj-1",
        "title": "t",
        "description": "d",
        "hat": "explorer",
        "base_branch": "main",
        "token_budget": 1000,
        "project": {
            "id": "prj-1",
            "name": "demo",
            "github_owner": "acme",
            "github_repo": "demo",
            "clone_url": "https://github.com/acme/demo.git",
            "default_branch": "main",
        },
        "encrypted_secrets": [],
    });
    let objective: Objective = serde_json::from_value(json).unwrap();
    assert_eq!(objective.max_iterations, DEFAULT_MAX_ITERATIONS);
    assert_eq!(objective.wall_clock_budget_secs, None);
}
