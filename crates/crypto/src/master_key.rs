// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! The worker's 32-byte local-store master key (spec.md §6: `master.key`).

use crate::sealed_box::CryptoError;
use rand_core::{OsRng, RngCore};
use std::path::Path;

/// A raw 32-byte key, generated once per worker and persisted with
/// owner-only permissions (spec.md §4.3, §6).
pub struct MasterKey(pub [u8; 32]);

impl MasterKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn load_or_create(path: &Path) -> Result<Self, CryptoError> {
        if path.exists() {
            Self::load(path)
        } else {
            let key = Self::generate();
            key.save(path)?;
            Ok(key)
        }
    }

    fn load(path: &Path) -> Result<Self, CryptoError> {
        let bytes = std::fs::read(path)?;
        let array: [u8; 32] =
            bytes.try_into().map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength(v.len()))?;
        Ok(Self(array))
    }

    fn save(&self, path: &Path) -> Result<(), CryptoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.0)?;
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
#[path = "master_key_tests.rs"]
mod tests;
