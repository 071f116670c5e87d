// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the vault, session and shell crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Token separating sequential sub-commands on one line.
pub const CHAIN_OPERATOR: &str = "&&";

/// Whether `name` can name a script: one word that is not mistaken for
/// [`CHAIN_OPERATOR`] when it appears on a line.
pub fn is_valid_script_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace) && !name.contains(CHAIN_OPERATOR)
}

/// Named partition of the vault file.
///
/// The four record collections hold encrypted envelopes. `Config` and
/// `Scripts` hold plaintext metadata that never requires the master key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Entries,
    Cards,
    Notes,
    Totp,
    Config,
    Scripts,
}

impl Collection {
    /// Collections whose values are encrypted record envelopes.
    pub const RECORDS: [Collection; 4] = [
        Collection::Entries,
        Collection::Cards,
        Collection::Notes,
        Collection::Totp,
    ];

    /// Name as stored in the `collection` column.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether values in this collection are encrypted records.
    pub fn holds_records(&self) -> bool {
        Self::RECORDS.contains(self)
    }
}
