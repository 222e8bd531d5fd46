// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Workflow tool effects: the data form of the `OnChecklistUpdate`,
//! `OnEvent`, `OnScratchpadUpdate`, and `OnMemoryStore` callbacks (spec.md
//! §9 design note).
//!
//! The design note frames these as callbacks registered on a Tool Executor
//! handle so the loop can apply mutations without sharing pointers into its
//! own state. In Rust, returning the intended mutation as data and letting
//! the caller apply it reaches the same goal (the loop still owns the state
//! and applies mutations on return) without an interior-mutability callback
//! object, so `ToolExecutor::execute` returns a list of these instead of
//! invoking callbacks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkflowEffect {
    /// Workflow tool `checklist_update`: mark a checklist item done or not.
    ChecklistUpdate { item: String, done: bool },
    /// Workflow tool `signal_event`: request a hat transition (spec.md §4.5,
    /// §4.8). `None` means "signal completion with no named target hat".
    SignalEvent { target_hat: Option<String> },
    /// Workflow tool `scratchpad_update`: replace one free-text scratchpad field.
    ScratchpadUpdate { field: ScratchpadField, value: String },
    /// Workflow tool `scratchpad_update`: append to `decisions` or `blockers`.
    ScratchpadAppend { field: ScratchpadListField, entry: String },
    /// Workflow tool `memory_store`: free-form key/value the loop persists
    /// alongside the session.
    MemoryStore { key: String, value: serde_json::Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScratchpadListField {
    Decisions,
    Blockers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScratchpadField {
    Understanding,
    Plan,
}

#[cfg(test)]
#[path = "workflow_effect_tests.rs"]
mod tests;
