// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The hat machine: the role an LLM plays inside a session, and the static
//! transition table that governs how it may move between roles.
//!
//! This lives in `hqw-core` rather than `hqw-hq` because the Ralph Loop
//! (worker-side) validates every transition it makes (spec.md §4.5); putting
//! the table in the HQ crate would force a worker -> hq dependency that would
//! otherwise only exist for this one lookup table.

use serde::{Deserialize, Serialize};

/// The role the LLM currently plays within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hat {
    Explorer,
    Planner,
    Designer,
    Creator,
    Critic,
    Editor,
    Resolver,
}

crate::simple_display! {
    Hat {
        Explorer => "explorer",
        Planner => "planner",
        Designer => "designer",
        Creator => "creator",
        Critic => "critic",
        Editor => "editor",
        Resolver => "resolver",
    }
}

impl Hat {
    pub const ALL: [Hat; 7] =
        [Hat::Explorer, Hat::Planner, Hat::Designer, Hat::Creator, Hat::Critic, Hat::Editor, Hat::Resolver];

    /// Hats this hat is allowed to transition into directly.
    ///
    /// Mirrors spec.md §4.8's static table exactly:
    ///
    /// ```text
    /// explorer -> {planner, designer, creator}
    /// planner  -> {designer, creator}
    /// designer -> {creator}
    /// creator  -> {critic, editor, resolver}
    /// critic   -> {creator, editor}
    /// editor   -> {}           (terminal)
    /// resolver -> {creator, critic, editor}
    /// ```
    pub fn allowed_next(self) -> &'static [Hat] {
        match self {
            Hat::Explorer => &[Hat::Planner, Hat::Designer, Hat::Creator],
            Hat::Planner => &[Hat::Designer, Hat::Creator],
            Hat::Designer => &[Hat::Creator],
            Hat::Creator => &[Hat::Critic, Hat::Editor, Hat::Resolver],
            Hat::Critic => &[Hat::Creator, Hat::Editor],
            Hat::Editor => &[],
            Hat::Resolver => &[Hat::Creator, Hat::Critic, Hat::Editor],
        }
    }

    /// True iff this hat's allowed-next set is empty.
    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

/// Outcome of [`TransitionEngine::on_hat_complete`]: either the loop moves to
/// a new hat, or the objective is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatCompletion {
    Next(Hat),
    TaskComplete,
}

/// Validates hat transitions and classifies terminal/completion behavior.
///
/// Stateless: has no side effects beyond the pure lookups spec.md §4.8
/// describes. Both the worker's Ralph Loop (validating a `signal_event`
/// transition before switching hats) and HQ (classifying a task's current
/// hat) consult the same table through this type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionEngine;

impl TransitionEngine {
    pub fn new() -> Self {
        Self
    }

    /// True iff `to` is in `from`'s allowed-next set.
    pub fn validate_transition(&self, from: Hat, to: Hat) -> bool {
        from.allowed_next().contains(&to)
    }

    /// True iff `hat`'s allowed-next set is empty.
    pub fn is_terminal(&self, hat: Hat) -> bool {
        hat.is_terminal()
    }

    /// The policy for a `signal_event` that does not name a target hat
    /// (spec.md §4.8):
    ///
    /// - terminal hats (`editor`) complete the task
    /// - `creator` -> `critic`, task not complete
    /// - `critic`, `explorer`, `resolver` signalling completion complete the task
    /// - `planner`/`designer` signalling completion also complete the task
    /// - any hat not covered above completes the task defensively
    pub fn on_hat_complete(&self, current: Hat) -> HatCompletion {
        match current {
            _ if current.is_terminal() => HatCompletion::TaskComplete,
            Hat::Creator => HatCompletion::Next(Hat::Critic),
            Hat::Critic | Hat::Explorer | Hat::Resolver => HatCompletion::TaskComplete,
            Hat::Planner | Hat::Designer => HatCompletion::TaskComplete,
            #[allow(unreachable_patterns)]
            _ => HatCompletion::TaskComplete,
        }
    }
}

#[cfg(test)]
#[path = "hat_tests.rs"]
mod tests;
