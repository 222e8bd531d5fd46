// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Worker error taxonomy (spec.md §7): fatal-init errors exit the process;
//! everything else is reported over the wire and the worker stays alive.

/// Errors that abort boot before the worker can send `ready` (spec.md §7
/// "Fatal init"). `main` maps these to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("failed to load or create worker identity: {0}")]
    Identity(#[from] hqw_crypto::CryptoError),
    #[error("failed to open local store: {0}")]
    Store(#[from] hqw_store::StoreError),
    #[error("failed to determine a writable data directory")]
    NoDataDir,
    #[error("mesh mode requires --hq-address")]
    NoMeshAddress,
    #[error("failed to connect to HQ: {0}")]
    Connect(#[source] std::io::Error),
    #[error("failed to send boot-sequence message: {0}")]
    Protocol(#[from] hqw_wire::ProtocolError),
}

/// Errors the Ralph Loop can terminate with mid-run (spec.md §4.5, §7).
/// Distinct from [`hqw_core::ReportStatus`]: budget exhaustion and
/// cancellation are expected outcomes represented there, not failures here.
#[derive(Debug, thiserror::Error)]
pub enum RalphError {
    #[error("llm call failed: {0}")]
    Llm(#[from] hqw_adapters::LlmError),
    #[error("cancelled")]
    Cancelled,
    #[error("checkpoint_failed")]
    CheckpointFailed,
    #[error(transparent)]
    Store(#[from] hqw_store::StoreError),
}

/// Errors the Worker Runner can hit handling one inbound message. Mapped to
/// a wire `error{code, message}` reply (spec.md §7 "Protocol") rather than
/// tearing down the connection.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("busy")]
    Busy,
    #[error("unknown_message_type")]
    UnknownMessageType,
    #[error("decrypt_failed")]
    DecryptFailed,
    #[error("workdir_missing")]
    WorkdirMissing,
    #[error("no session to resume")]
    NoSessionToResume,
    #[error(transparent)]
    Protocol(#[from] hqw_wire::ProtocolError),
    #[error(transparent)]
    Store(#[from] hqw_store::StoreError),
}

impl RunnerError {
    /// The wire `error.code` this maps to (spec.md §6 `error: {code, message}`).
    pub fn code(&self) -> &'static str {
        match self {
            RunnerError::Busy => "busy",
            RunnerError::UnknownMessageType => "unknown_message_type",
            RunnerError::DecryptFailed => "decrypt_failed",
            RunnerError::WorkdirMissing => "workdir_missing",
            RunnerError::NoSessionToResume => "no_session_to_resume",
            RunnerError::Protocol(_) => "protocol_error",
            RunnerError::Store(_) => "store_error",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
