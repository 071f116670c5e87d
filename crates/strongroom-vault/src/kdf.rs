// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from the master password.
//!
//! Uses Algorithm::Argon2id, Version::V0x13. The cost parameters are stored
//! next to the salt so a vault keeps opening after the configured defaults
//! change.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use strongroom_config::model::KdfConfig;
use strongroom_core::StrongroomError;

use crate::memory::{MasterKey, KEY_LEN};

/// Length of the random salt in bytes.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<&KdfConfig> for KdfParams {
    fn from(config: &KdfConfig) -> Self {
        Self {
            memory_cost: config.memory_cost,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

/// Derive the master key from a password and salt.
///
/// Deterministic for the same inputs. The output is written straight into
/// the protected key slot. Fails with `KdfFailure` only when the parameters
/// are rejected, never because of the password content.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<MasterKey, StrongroomError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| StrongroomError::KdfFailure(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut key = MasterKey::zeroed()?;
    argon2
        .hash_password_into(password, salt, key.as_mut_bytes())
        .map_err(|e| StrongroomError::KdfFailure(format!("Argon2id derivation failed: {e}")))?;

    Ok(key)
}

/// Generate a random salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], StrongroomError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| StrongroomError::Internal("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
pub(crate) fn test_params() -> KdfParams {
    KdfParams {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [1u8; SALT_LEN];
        let key1 = derive_key(b"correct horse", &salt, &test_params()).unwrap();
        let key2 = derive_key(b"correct horse", &salt, &test_params()).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn different_password_gives_different_key() {
        let salt = [2u8; SALT_LEN];
        let key1 = derive_key(b"one", &salt, &test_params()).unwrap();
        let key2 = derive_key(b"two", &salt, &test_params()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn different_salt_gives_different_key() {
        let key1 = derive_key(b"same", &[1u8; SALT_LEN], &test_params()).unwrap();
        let key2 = derive_key(b"same", &[2u8; SALT_LEN], &test_params()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn empty_password_still_derives() {
        assert!(derive_key(b"", &[0u8; SALT_LEN], &test_params()).is_ok());
    }

    #[test]
    fn zero_iterations_is_kdf_failure() {
        let params = KdfParams {
            iterations: 0,
            ..test_params()
        };
        let err = derive_key(b"pw", &[0u8; SALT_LEN], &params).unwrap_err();
        assert!(matches!(err, StrongroomError::KdfFailure(_)));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }

    #[test]
    fn params_from_config() {
        let params = KdfParams::from(&KdfConfig::default());
        assert_eq!(params.memory_cost, 65536);
        assert_eq!(params.iterations, 3);
        assert_eq!(params.parallelism, 4);
    }
}
