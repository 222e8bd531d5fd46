// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Per-record authenticated encryption for the local store (spec.md §4.3).
//!
//! Every record gets its own random 24-byte nonce, stored alongside the
//! ciphertext; reads that fail authentication are treated as fatal (disk
//! tampering), never silently skipped.

use crate::kdf;
use crate::master_key::MasterKey;
use crate::sealed_box::CryptoError;
use xsalsa20poly1305::aead::{Aead, KeyInit, OsRng};
use xsalsa20poly1305::{Key, XSalsa20Poly1305, NONCE_SIZE};

const STORE_KEY_INFO: &[u8] = b"hqw-store-v1";

/// Symmetric cipher over the local store's master key.
pub struct StoreCipher {
    cipher: XSalsa20Poly1305,
}

impl StoreCipher {
    pub fn from_master_key(master_key: &MasterKey) -> Self {
        let derived = kdf::derive_key(&master_key.0, STORE_KEY_INFO);
        let key = Key::from_slice(&derived);
        Self { cipher: XSalsa20Poly1305::new(key) }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        xsalsa20poly1305::aead::rand_core::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
        let nonce = xsalsa20poly1305::Nonce::from_slice(&nonce_bytes);

        let mut out = self.cipher.encrypt(nonce, plaintext).map_err(|_| CryptoError::DecryptFailed)?;
        let mut record = nonce_bytes.to_vec();
        record.append(&mut out);
        Ok(record)
    }

    /// Decrypt a `nonce || ciphertext` record produced by [`Self::encrypt`].
    pub fn decrypt(&self, record: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if record.len() < NONCE_SIZE {
            return Err(CryptoError::CorruptIdentity("record shorter than nonce".to_string()));
        }
        let (nonce_bytes, ciphertext) = record.split_at(NONCE_SIZE);
        let nonce = xsalsa20poly1305::Nonce::from_slice(nonce_bytes);
        self.cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::DecryptFailed)
    }
}

#[cfg(test)]
#[path = "store_cipher_tests.rs"]
mod tests;
