// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Local store error taxonomy (spec.md §7).

/// Errors from opening or mutating the local store.
///
/// A decrypt failure is always treated as fatal (possible disk tampering),
/// never silently skipped (spec.md §4.3).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error("local store authentication failed; the store file may be corrupt or tampered with")]
    AuthenticationFailed,
}

impl From<hqw_crypto::CryptoError> for StoreError {
    fn from(_: hqw_crypto::CryptoError) -> Self {
        StoreError::AuthenticationFailed
    }
}
