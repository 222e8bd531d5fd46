// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Shared domain types for HQ and workers: identifiers, the hat transition
//! table, objectives, sessions, activity events, and tasks.
//!
//! Nothing in this crate talks to a network, a filesystem, or an LLM; those
//! concerns live in `hqw-wire`, `hqw-store`, `hqw-crypto`, and `hqw-adapters`.
//! `hqw-core` is the vocabulary every other crate in the workspace shares.

#[macro_use]
pub mod macros;

pub mod id;
pub mod ids;

pub mod clock;
pub mod hat;

pub mod activity;
pub mod objective;
pub mod project;
pub mod session;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use activity::{ActivityEvent, ActivityKind};
pub use clock::{Clock, FakeClock, SystemClock};
pub use hat::{Hat, HatCompletion, TransitionEngine};
pub use id::IdBuf;
pub use ids::{ActivityEventId, ObjectiveId, ProjectId, QuestId, SessionId, TaskId, WorkerId};
pub use objective::{Objective, Secrets};
pub use project::ProjectRef;
pub use session::{Report, ReportStatus, Scratchpad, Session, SessionStatus};
pub use task::{DependencyGraph, DependencyGraphError, Task, TaskStatus};

#[cfg(any(test, feature = "test-support"))]
pub use objective::ObjectiveBuilder;
#[cfg(any(test, feature = "test-support"))]
pub use session::SessionBuilder;
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
