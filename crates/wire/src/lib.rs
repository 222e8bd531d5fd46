// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The HQ <-> worker wire protocol: a length-framed JSON message codec and
//! the `Connection` type built on top of it (spec.md §4.1, §4.2).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod codec;
mod connection;
mod message;

pub use codec::{decode, encode, read_message, read_message_capped, write_message, ProtocolError, DEFAULT_MAX_FRAME_LEN};
pub use connection::Connection;
pub use message::{Message, MessagePayload, SyncConfig, WorkerState};
