// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Shared fixtures for builder defaults and downstream crate tests.
//!
//! Gated the same way `builder!` gates its generated code, so these helpers
//! are only ever compiled into test or `test-support` builds.

use crate::project::ProjectRef;

/// The project a freshly built [`crate::objective::Objective`] points at
/// unless a test overrides it.
pub fn default_project() -> ProjectRef {
    ProjectRef::builder().build()
}
