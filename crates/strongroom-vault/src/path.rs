// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record path normalization.
//!
//! Paths are case-insensitive, `/`-delimited identifiers such as
//! `bank/visa`. Every path is normalized before it reaches storage so that
//! `Bank//Visa/` and `bank/visa` name the same record.

use strongroom_core::StrongroomError;

/// Folder separator inside record paths.
pub const FOLDER_DELIMITER: char = '/';

/// Longest accepted normalized path, in bytes.
pub const MAX_PATH_LEN: usize = 256;

/// Normalize a record path.
///
/// Trims surrounding whitespace, lowercases, collapses repeated separators
/// and strips leading and trailing separators.
pub fn normalize(raw: &str) -> Result<String, StrongroomError> {
    if raw.chars().any(char::is_control) {
        return Err(invalid(raw, "contains control characters"));
    }

    let normalized = raw
        .trim()
        .to_lowercase()
        .split(FOLDER_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        return Err(invalid(raw, "path is empty"));
    }
    if normalized.len() > MAX_PATH_LEN {
        return Err(invalid(
            raw,
            &format!("longer than {MAX_PATH_LEN} bytes"),
        ));
    }
    Ok(normalized)
}

/// Normalize a folder prefix. The result always ends with the separator,
/// so `bank` never matches `bankrupt/...`.
pub fn normalize_prefix(raw: &str) -> Result<String, StrongroomError> {
    let mut prefix = normalize(raw)?;
    prefix.push(FOLDER_DELIMITER);
    Ok(prefix)
}

fn invalid(raw: &str, reason: &str) -> StrongroomError {
    StrongroomError::InvalidPath {
        path: raw.to_string(),
        reason: reason.to_string(),
    }
}
