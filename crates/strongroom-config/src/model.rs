// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strongroom credential vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Strongroom configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrongroomConfig {
    /// Vault file location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Argon2id cost parameters used when a vault is created or re-keyed.
    #[serde(default)]
    pub kdf: KdfConfig,

    /// Interactive session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the vault file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("strongroom").join("strongroom.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "strongroom.db".to_string())
}

/// Argon2id parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KdfConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_memory_cost")]
    pub memory_cost: u32,

    /// Iteration count (default: 3).
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Parallelism lanes (default: 4).
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_cost: default_memory_cost(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

fn default_memory_cost() -> u32 {
    65536
}

fn default_iterations() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    4
}

/// Interactive session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Seconds after unlock before the session relocks. The clock is not
    /// refreshed by activity. `0` disables automatic expiry entirely.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Text shown before the prompt in session mode.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Named command templates, e.g. `login = "show $1 && totp code $1"`.
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl SessionConfig {
    /// The expiry window, or `None` when the session never expires.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            prefix: default_prefix(),
            scripts: BTreeMap::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    900
}

fn default_prefix() -> String {
    "strongroom".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
