// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Cryptographic primitives for worker identity, sealed-box secrets, and
//! the local store's symmetric encryption (spec.md §3, §4.1, §4.3, §6).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod identity;
mod kdf;
mod master_key;
mod sealed_box;
mod store_cipher;

pub use identity::WorkerIdentity;
pub use kdf::derive_key;
pub use master_key::MasterKey;
pub use sealed_box::{BoxKeypair, BoxPublicKey, CryptoError};
pub use store_cipher::StoreCipher;
