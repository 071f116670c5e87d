// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master password acquisition via STRONGROOM_MASTER_PASSWORD or a TTY prompt.

use std::io::IsTerminal;

use secrecy::SecretString;
use strongroom_core::StrongroomError;

/// Environment variable consulted before prompting.
pub const MASTER_PASSWORD_ENV_VAR: &str = "STRONGROOM_MASTER_PASSWORD";

fn from_env() -> Option<SecretString> {
    std::env::var(MASTER_PASSWORD_ENV_VAR)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

fn read_hidden(label: &str) -> Result<String, StrongroomError> {
    rpassword::prompt_password(label)
        .map_err(|e| StrongroomError::Internal(format!("failed to read password: {e}")))
}

fn no_source() -> StrongroomError {
    StrongroomError::Config(format!(
        "no master password available; set {MASTER_PASSWORD_ENV_VAR} or run interactively"
    ))
}

/// Get the master password: environment first, then a no-echo prompt.
pub fn get_master_password() -> Result<SecretString, StrongroomError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_source());
    }

    let password = read_hidden("Master password: ")?;
    if password.is_empty() {
        return Err(StrongroomError::Config("empty master password not allowed".to_string()));
    }
    Ok(SecretString::from(password))
}

/// Get a new master password, asking twice on a terminal.
pub fn get_new_master_password_with_confirm() -> Result<SecretString, StrongroomError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        return Err(no_source());
    }

    let first = zeroize::Zeroizing::new(read_hidden("New master password: ")?);
    let second = zeroize::Zeroizing::new(read_hidden("Confirm master password: ")?);
    if *first != *second {
        return Err(StrongroomError::Config("passwords do not match".to_string()));
    }
    if first.is_empty() {
        return Err(StrongroomError::Config("empty master password not allowed".to_string()));
    }
    Ok(SecretString::from(first.to_string()))
}
