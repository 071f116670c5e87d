// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./strongroom.toml` > `~/.config/strongroom/strongroom.toml`
//! > `/etc/strongroom/strongroom.toml` with environment variable overrides via
//! the `STRONGROOM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::StrongroomConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/strongroom/strongroom.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "strongroom.toml";

/// Top-level sections that environment variables may target.
const ENV_SECTIONS: [&str; 4] = ["storage_", "kdf_", "session_", "log_"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/strongroom/strongroom.toml` (system-wide)
/// 3. `~/.config/strongroom/strongroom.toml` (user XDG config)
/// 4. `./strongroom.toml` (local directory)
/// 5. `STRONGROOM_*` environment variables
pub fn load_config() -> Result<StrongroomConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<StrongroomConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongroomConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StrongroomConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongroomConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StrongroomConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("strongroom").join(LOCAL_CONFIG_FILE))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that
/// `STRONGROOM_SESSION_TIMEOUT_SECS` maps to `session.timeout_secs`, not
/// `session.timeout.secs`. Variables outside the known sections (such as
/// `STRONGROOM_MASTER_PASSWORD`) are ignored here.
fn env_provider() -> Env {
    Env::prefixed("STRONGROOM_")
        .filter(|key| section_key(key.as_str()).is_some())
        .map(|key| {
            section_key(key.as_str())
                .unwrap_or_else(|| key.as_str().to_ascii_lowercase())
                .into()
        })
}

/// Map a prefix-stripped variable name onto its dotted config key.
///
/// Figment passes keys in the case they were written, so the match is
/// case-insensitive: `SESSION_TIMEOUT_SECS` becomes `session.timeout_secs`.
fn section_key(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    ENV_SECTIONS.iter().find_map(|section| {
        key.strip_prefix(section)
            .map(|rest| format!("{}.{rest}", section.trim_end_matches('_')))
    })
}
