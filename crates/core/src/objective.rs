// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Objective: a unit of work dispatched to a worker.

use crate::hat::Hat;
use crate::ids::{ObjectiveId, ProjectId};
use crate::project::ProjectRef;
use serde::{Deserialize, Serialize};

/// Plaintext secrets an objective carries, decrypted only inside the worker
/// that owns the matching private key (spec.md §3). Unrecognized fields are
/// preserved on round-trip via `extra` so an older worker doesn't silently
/// drop credentials a newer HQ started sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secrets {
    pub anthropic_key: String,
    pub github_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fly_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudflare_token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Default cap on Ralph Loop iterations per session (spec.md §4.5 step 8).
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// A unit of work dispatched to a worker: one LLM-driven task.
///
/// Immutable once dispatched (spec.md §3). The `encrypted_secrets` field
/// holds the sealed-box ciphertext produced by `hqw-crypto::SealedBox::seal`
/// against the owning worker's public key; `hqw-core` does not depend on the
/// crypto crate, so it is carried here as an opaque byte blob.
///
/// `max_iterations` and `wall_clock_budget_secs` are budget inputs to the
/// Ralph Loop's step-8 check (spec.md §4.5, §7); they live here rather than
/// as loop-internal constants so HQ can tune them per objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub title: String,
    pub description: String,
    pub hat: Hat,
    pub base_branch: String,
    pub token_budget: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// `None` means no wall-clock cap beyond token/iteration budgets.
    #[serde(default)]
    pub wall_clock_budget_secs: Option<u64>,
    pub project: ProjectRef,
    pub encrypted_secrets: Vec<u8>,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

impl Objective {
    pub fn project_id(&self) -> ProjectId {
        self.project.id
    }
}

crate::builder! {
    pub struct ObjectiveBuilder => Objective {
        into {
            title: String = "demo objective",
            description: String = "do the thing",
            base_branch: String = "main",
        }
        set {
            hat: Hat = Hat::Explorer,
            token_budget: u64 = 50_000,
            max_iterations: u32 = DEFAULT_MAX_ITERATIONS,
            wall_clock_budget_secs: Option<u64> = None,
            project: ProjectRef = crate::test_support::default_project(),
            encrypted_secrets: Vec<u8> = Vec::new(),
        }
        computed {
            id: ObjectiveId = ObjectiveId::new(),
        }
    }
}

#[cfg(test)]
#[path = "objective_tests.rs"]
mod tests;
