// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use strongroom_core::{CHAIN_OPERATOR, is_valid_script_name};

use crate::diagnostic::ConfigError;
use crate::model::StrongroomConfig;

/// Smallest Argon2id memory cost accepted from configuration, in KiB.
pub const MIN_KDF_MEMORY_COST: u32 = 8192;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &StrongroomConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.kdf.memory_cost < MIN_KDF_MEMORY_COST {
        invalid(format!(
            "kdf.memory_cost must be at least {MIN_KDF_MEMORY_COST} (8 MiB), got {}",
            config.kdf.memory_cost
        ));
    }
    if config.kdf.iterations < 1 {
        invalid(format!(
            "kdf.iterations must be at least 1, got {}",
            config.kdf.iterations
        ));
    }
    if config.kdf.parallelism < 1 {
        invalid(format!(
            "kdf.parallelism must be at least 1, got {}",
            config.kdf.parallelism
        ));
    }

    for (name, template) in &config.session.scripts {
        if name.trim().is_empty() {
            invalid("session.scripts names must not be empty".to_string());
        } else if !is_valid_script_name(name) {
            invalid(format!(
                "session.scripts name `{name}` must be a single token without `{CHAIN_OPERATOR}`"
            ));
        }
        if template.trim().is_empty() {
            invalid(format!("session.scripts.{name} has an empty template"));
        }
    }

    if !matches!(
        config.log.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        invalid(format!(
            "log.level must be one of trace, debug, info, warn, error; got `{}`",
            config.log.level
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &StrongroomConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&StrongroomConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = StrongroomConfig::default();
        config.storage.database_path = "  ".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("database_path")));
    }

    #[test]
    fn weak_kdf_parameters_fail_validation() {
        let mut config = StrongroomConfig::default();
        config.kdf.memory_cost = 1024;
        config.kdf.iterations = 0;
        config.kdf.parallelism = 0;
        let messages = messages(&config);
        assert_eq!(messages.len(), 3, "{messages:?}");
    }

    #[test]
    fn script_name_with_operator_fails_validation() {
        let mut config = StrongroomConfig::default();
        config
            .session
            .scripts
            .insert("a&&b".to_string(), "ls".to_string());
        assert!(messages(&config).iter().any(|m| m.contains("a&&b")));
    }

    #[test]
    fn script_name_with_space_fails_validation() {
        let mut config = StrongroomConfig::default();
        config
            .session
            .scripts
            .insert("log in".to_string(), "ls".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = StrongroomConfig::default();
        config.log.level = "verbose".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("log.level")));
    }
}
