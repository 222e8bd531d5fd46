// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Worker identity: a stable id plus an Ed25519 signing keypair and a
//! separate X25519 box keypair, persisted once and reused across restarts
//! (spec.md §3, §6).
//!
//! Ed25519 and X25519 are different curve representations; rather than
//! converting one signing key into a Diffie-Hellman key (possible but
//! non-standard and easy to get subtly wrong), the identity file carries
//! both keypairs independently. The Ed25519 key is reserved for future
//! message-signing use; the X25519 key is the one HQ actually seals secrets
//! to today.

use crate::sealed_box::{BoxKeypair, BoxPublicKey, CryptoError};
use base64::Engine;
use ed25519_dalek::SigningKey;
use hqw_core::WorkerId;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct IdentityFile {
    worker_id: String,
    ed25519_secret_b64: String,
    box_secret_b64: String,
}

/// A worker's persistent identity.
pub struct WorkerIdentity {
    pub worker_id: WorkerId,
    signing_key: SigningKey,
    box_keypair: BoxKeypair,
}

impl WorkerIdentity {
    pub fn generate(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            signing_key: SigningKey::generate(&mut OsRng),
            box_keypair: BoxKeypair::generate(),
        }
    }

    pub fn box_public_key(&self) -> BoxPublicKey {
        self.box_keypair.public_key()
    }

    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn sign(&self, message: &[u8]) -> ed25519_dalek::Signature {
        use ed25519_dalek::Signer;
        self.signing_key.sign(message)
    }

    /// Open a sealed-box payload addressed to this worker's box public key.
    pub fn open_secrets(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.box_keypair.open(ciphertext)
    }

    /// Load the identity at `path`, or generate and persist a fresh one if
    /// the file does not exist yet (spec.md §3: "created on first start").
    pub fn load_or_create(path: &Path, worker_id: impl FnOnce() -> WorkerId) -> Result<Self, CryptoError> {
        if path.exists() {
            Self::load(path)
        } else {
            let identity = Self::generate(worker_id());
            identity.save(path)?;
            Ok(identity)
        }
    }

    fn load(path: &Path) -> Result<Self, CryptoError> {
        let contents = std::fs::read_to_string(path)?;
        let file: IdentityFile = serde_json::from_str(&contents)?;

        let engine = base64::engine::general_purpose::STANDARD;
        let ed25519_secret: [u8; 32] = engine
            .decode(&file.ed25519_secret_b64)
            .map_err(|e| CryptoError::CorruptIdentity(e.to_string()))?
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength(v.len()))?;
        let box_secret: [u8; 32] = engine
            .decode(&file.box_secret_b64)
            .map_err(|e| CryptoError::CorruptIdentity(e.to_string()))?
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength(v.len()))?;

        Ok(Self {
            worker_id: WorkerId::new(file.worker_id),
            signing_key: SigningKey::from_bytes(&ed25519_secret),
            box_keypair: BoxKeypair::from_bytes(box_secret),
        })
    }

    fn save(&self, path: &Path) -> Result<(), CryptoError> {
        let engine = base64::engine::general_purpose::STANDARD;
        let file = IdentityFile {
            worker_id: self.worker_id.as_str().to_string(),
            ed25519_secret_b64: engine.encode(self.signing_key.to_bytes()),
            box_secret_b64: engine.encode(self.box_keypair.secret_bytes()),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        restrict_permissions(path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
