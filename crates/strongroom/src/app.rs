// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by the shell and one-shot commands.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use strongroom_config::StrongroomConfig;
use strongroom_core::StrongroomError;
use strongroom_session::{Scripts, Session};
use strongroom_vault::{KdfParams, Vault};
use tracing::info;

/// Attempts allowed before an interactive unlock gives up.
pub const MAX_UNLOCK_ATTEMPTS: usize = 3;

/// Open the configured vault file.
pub async fn open_vault(config: &StrongroomConfig) -> Result<Vault, StrongroomError> {
    Vault::open(Path::new(&config.storage.database_path)).await
}

/// Create a new vault protected by a freshly chosen master password.
pub async fn run_init(config: &StrongroomConfig) -> Result<(), StrongroomError> {
    let vault = open_vault(config).await?;
    if vault.is_initialized().await? {
        return Err(StrongroomError::Config(format!(
            "a vault already exists at {}",
            config.storage.database_path
        )));
    }
    let password = strongroom_vault::get_new_master_password_with_confirm()?;
    let params = KdfParams::from(&config.kdf);
    // The returned store is unlocked; dropping it wipes the key.
    vault
        .initialize(password.expose_secret().as_bytes(), params)
        .await?;
    info!(path = %config.storage.database_path, "vault initialized");
    eprintln!("Vault created at {}", config.storage.database_path);
    vault.close().await
}

/// A locked session over `vault` with stored and configured scripts merged.
pub async fn open_session(
    config: &StrongroomConfig,
    vault: &Vault,
) -> Result<Session, StrongroomError> {
    if !vault.is_initialized().await? {
        return Err(StrongroomError::Config(format!(
            "no vault at {}; run `strongroom init` first",
            config.storage.database_path
        )));
    }
    let keystore = vault.keystore().await?;
    let stored = vault.scripts().await?;
    let scripts = Scripts::merged(&config.session.scripts, stored);
    Ok(Session::new(keystore, config.session.timeout(), scripts))
}

/// Unlock with passwords from `next_password`, re-asking after a wrong one.
pub fn unlock_with<F>(session: &Session, mut next_password: F) -> Result<(), StrongroomError>
where
    F: FnMut() -> Result<SecretString, StrongroomError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match session.unlock(&next_password()?) {
            Ok(()) => return Ok(()),
            Err(err) if err.is_auth_failure() && attempt < MAX_UNLOCK_ATTEMPTS => {
                eprintln!("{err}, try again");
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use strongroom_vault::{KeyHeader, KeyStore};

    use super::*;

    fn locked_session() -> Session {
        let params = KdfParams {
            memory_cost: 8192,
            iterations: 1,
            parallelism: 1,
        };
        let (_, header) = KeyHeader::generate(b"right", params).unwrap();
        Session::new(KeyStore::new(header), Some(Duration::from_secs(60)), Scripts::default())
    }

    #[test]
    fn unlock_retries_after_a_wrong_password() {
        let session = locked_session();
        let mut answers = ["wrong", "right"].into_iter();
        unlock_with(&session, || {
            Ok(SecretString::from(answers.next().unwrap_or_default().to_string()))
        })
        .unwrap();
        assert!(session.is_unlocked());
    }

    #[test]
    fn unlock_gives_up_after_max_attempts() {
        let session = locked_session();
        let mut calls = 0;
        let err = unlock_with(&session, || {
            calls += 1;
            Ok(SecretString::from("wrong".to_string()))
        })
        .unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(calls, MAX_UNLOCK_ATTEMPTS);
        assert!(!session.is_unlocked());
    }
}
