// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! HKDF-SHA256 key derivation for the local store's symmetric cipher.

use hkdf::Hkdf;
use sha2::Sha256;

/// Derive a 32-byte key from `master_key` bound to `info` (a fixed,
/// purpose-specific label), so the raw master key is never used directly as
/// a cipher key (spec.md §4.3, §6).
pub fn derive_key(master_key: &[u8; 32], info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, master_key);
    let mut out = [0u8; 32];
    if hk.expand(info, &mut out).is_err() {
        unreachable!("32 bytes is always a valid HKDF-SHA256 output length");
    }
    out
}

#[cfg(test)]
#[path = "kdf_tests.rs"]
mod tests;
