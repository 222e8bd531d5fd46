// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Anonymous sealed-box encryption for objective secrets (spec.md §4.1, §6).
//!
//! An ephemeral X25519 keypair is generated per `seal` call and discarded;
//! only someone holding the recipient's private key can recover the
//! plaintext. This is the NaCl `crypto_box_seal` construction.

use crypto_box::{PublicKey, SecretKey};
use rand_core::OsRng;

/// Errors from the sealed-box layer.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Authentication failed on open: either tampering or the wrong key.
    #[error("decrypt_failed")]
    DecryptFailed,
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("corrupt identity file: {0}")]
    CorruptIdentity(String),
}

/// A worker's X25519 keypair used to receive sealed secrets.
#[derive(Clone)]
pub struct BoxKeypair {
    secret: SecretKey,
}

impl BoxKeypair {
    pub fn generate() -> Self {
        Self { secret: SecretKey::generate(&mut OsRng) }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { secret: SecretKey::from(bytes) }
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub fn public_key(&self) -> BoxPublicKey {
        BoxPublicKey { inner: self.secret.public_key() }
    }

    /// Open a sealed box addressed to this keypair's public key.
    pub fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        crypto_box::seal_open(&self.secret, ciphertext).map_err(|_| CryptoError::DecryptFailed)
    }
}

/// A worker's public box key, as advertised on `ready` (spec.md §6).
#[derive(Clone)]
pub struct BoxPublicKey {
    inner: PublicKey,
}

impl BoxPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { inner: PublicKey::from(bytes) }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        *self.inner.as_bytes()
    }

    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|_| CryptoError::InvalidKeyLength(0))?;
        let array: [u8; 32] =
            bytes.try_into().map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength(v.len()))?;
        Ok(Self::from_bytes(array))
    }

    /// Seal `plaintext` so only the matching private key can open it.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        crypto_box::seal(&mut OsRng, &self.inner, plaintext).map_err(|_| CryptoError::DecryptFailed)
    }
}

#[cfg(test)]
#[path = "sealed_box_tests.rs"]
mod tests;
