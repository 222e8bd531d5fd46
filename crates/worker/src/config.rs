// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Worker CLI configuration (spec.md §6).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How the worker reaches HQ (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum Mode {
    Subprocess,
    Mesh,
}

/// `hqw-worker` flags (spec.md §6).
#[derive(Debug, Parser)]
#[command(name = "hqw-worker", version, about = "HQ+Worker Ralph Loop worker process")]
pub struct Config {
    #[arg(long, value_enum, default_value_t = Mode::Subprocess)]
    pub mode: Mode,

    /// Stable worker id, reused across restarts. Defaults to `worker-<hostname>`.
    #[arg(long)]
    pub id: Option<String>,

    /// Directory holding `identity.json`, `master.key`, and `worker.db`.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// HQ's base64 X25519 public key, required in subprocess mode.
    #[arg(long)]
    pub hq_public_key: Option<String>,

    #[arg(long)]
    pub mesh_control_url: Option<String>,

    #[arg(long)]
    pub mesh_auth_key: Option<String>,

    /// HQ's mesh address (mesh mode only).
    #[arg(long)]
    pub hq_address: Option<String>,
}

impl Config {
    /// Resolve `--id`, defaulting to `worker-<hostname>` (spec.md §6).
    pub fn worker_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| format!("worker-{}", hostname()))
    }

    /// Resolve `--data-dir`, defaulting to the platform user data dir
    /// (spec.md §6 "default platform user data dir").
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(|| dirs::data_dir().map(|d| d.join("hqw-worker")))
    }

    /// True if required flags for the selected mode are present
    /// (spec.md §6: `--hq-public-key` required in subprocess mode).
    pub fn validate(&self) -> Result<(), String> {
        match self.mode {
            Mode::Subprocess if self.hq_public_key.is_none() => {
                Err("--hq-public-key is required in subprocess mode".to_string())
            }
            _ => Ok(()),
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            hostname_from_uname().or_else(|| std::env::var("COMPUTERNAME").ok())
        })
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(unix)]
fn hostname_from_uname() -> Option<String> {
    let output = std::process::Command::new("hostname").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}

#[cfg(not(unix))]
fn hostname_from_uname() -> Option<String> {
    None
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
