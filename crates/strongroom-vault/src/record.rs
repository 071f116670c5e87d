// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record kinds and their canonical plaintext encoding.
//!
//! A record serializes as one format byte followed by a JSON document. New
//! optional fields can be added without bumping the format; readers reject
//! format bytes they do not know instead of guessing.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strongroom_core::{Collection, StrongroomError};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Current plaintext format.
pub const RECORD_FORMAT_V1: u8 = 1;

/// Capabilities shared by every stored record kind.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this kind lives in.
    const COLLECTION: Collection;

    /// Identity of the record within its collection.
    fn path(&self) -> &str;

    fn set_path(&mut self, path: String);

    /// Canonical plaintext: format byte then JSON.
    fn to_plaintext(&self) -> Result<Zeroizing<Vec<u8>>, StrongroomError> {
        let mut out = Zeroizing::new(vec![RECORD_FORMAT_V1]);
        serde_json::to_writer(&mut *out, self)
            .map_err(|e| StrongroomError::Internal(format!("failed to encode record: {e}")))?;
        Ok(out)
    }

    /// Parse canonical plaintext produced by [`Record::to_plaintext`].
    fn from_plaintext(bytes: &[u8]) -> Result<Self, StrongroomError> {
        match bytes.split_first() {
            Some((&RECORD_FORMAT_V1, body)) => serde_json::from_slice(body).map_err(|e| {
                // Only the position is reported; serde messages can quote field values.
                StrongroomError::Internal(format!(
                    "malformed {} record at line {} column {}",
                    Self::COLLECTION,
                    e.line(),
                    e.column()
                ))
            }),
            Some((&version, _)) => Err(StrongroomError::UnsupportedFormat { version }),
            None => Err(StrongroomError::Internal(format!(
                "empty {} record payload",
                Self::COLLECTION
            ))),
        }
    }
}

/// A login credential.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Entry {
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub notes: String,
    /// `None` means the entry never expires.
    #[serde(default)]
    #[zeroize(skip)]
    pub expires: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: String::new(),
            password: String::new(),
            url: String::new(),
            notes: String::new(),
            expires: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_expiry(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

impl Record for Entry {
    const COLLECTION: Collection = Collection::Entries;

    fn path(&self) -> &str {
        &self.name
    }

    fn set_path(&mut self, path: String) {
        self.name = path;
    }
}

/// A payment card.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Card {
    pub name: String,
    /// Free-form card type, e.g. "debit".
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub security_code: String,
    /// As printed on the card, e.g. "08/29".
    #[serde(default)]
    pub expire_date: String,
    #[serde(default)]
    pub notes: String,
}

impl Card {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: String::new(),
            number: String::new(),
            security_code: String::new(),
            expire_date: String::new(),
            notes: String::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_expire_date(mut self, date: impl Into<String>) -> Self {
        self.expire_date = date.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_security_code(mut self, code: impl Into<String>) -> Self {
        self.security_code = code.into();
        self
    }
}

impl Record for Card {
    const COLLECTION: Collection = Collection::Cards;

    fn path(&self) -> &str {
        &self.name
    }

    fn set_path(&mut self, path: String) {
        self.name = path;
    }
}

/// Free-text secure note.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Note {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

impl Note {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl Record for Note {
    const COLLECTION: Collection = Collection::Notes;

    fn path(&self) -> &str {
        &self.name
    }

    fn set_path(&mut self, path: String) {
        self.name = path;
    }
}

/// A time-based one-time password seed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Totp {
    pub name: String,
    /// Base32 shared secret as handed out by the issuer.
    pub secret: String,
    #[serde(default = "default_totp_digits")]
    #[zeroize(skip)]
    pub digits: u32,
    /// Step length in seconds.
    #[serde(default = "default_totp_period")]
    #[zeroize(skip)]
    pub period: u64,
}

fn default_totp_digits() -> u32 {
    6
}

fn default_totp_period() -> u64 {
    30
}

impl Totp {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
            digits: default_totp_digits(),
            period: default_totp_period(),
        }
    }

    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }
}

impl Record for Totp {
    const COLLECTION: Collection = Collection::Totp;

    fn path(&self) -> &str {
        &self.name
    }

    fn set_path(&mut self, path: String) {
        self.name = path;
    }
}

macro_rules! redacted_debug {
    ($($kind:ty),+) => {
        $(
            impl std::fmt::Debug for $kind {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.debug_struct(stringify!($kind))
                        .field("name", &self.name)
                        .finish_non_exhaustive()
                }
            }
        )+
    };
}

redacted_debug!(Entry, Card, Note, Totp);

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn plaintext_starts_with_format_byte() {
        let entry = Entry::new("github").with_username("octo");
        let bytes = entry.to_plaintext().unwrap();
        assert_eq!(bytes[0], RECORD_FORMAT_V1);
        assert_eq!(Entry::from_plaintext(&bytes).unwrap(), entry);
    }

    #[test]
    fn unknown_format_fails_closed() {
        let mut bytes = Note::new("n", "body").to_plaintext().unwrap().to_vec();
        bytes[0] = 7;
        assert!(matches!(
            Note::from_plaintext(&bytes),
            Err(StrongroomError::UnsupportedFormat { version: 7 })
        ));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(Card::from_plaintext(&[]).is_err());
    }

    #[test]
    fn garbage_payload_does_not_echo_contents() {
        let bytes = [RECORD_FORMAT_V1, b'{', b'"', b'x'];
        let err = Entry::from_plaintext(&bytes).unwrap_err().to_string();
        assert!(err.contains("malformed entries record"), "{err}");
    }

    #[test]
    fn older_documents_without_new_fields_still_decode() {
        let mut bytes = vec![RECORD_FORMAT_V1];
        bytes.extend_from_slice(br#"{"name":"old","secret":"JBSWY3DPEHPK3PXP"}"#);
        let totp = Totp::from_plaintext(&bytes).unwrap();
        assert_eq!(totp.digits, 6);
        assert_eq!(totp.period, 30);
    }

    #[test]
    fn entry_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2020, 1, 10, 15, 4, 5).unwrap();
        let future = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(Entry::new("a").with_expiry(past).is_expired(now));
        assert!(!Entry::new("b").with_expiry(future).is_expired(now));
        assert!(!Entry::new("c").is_expired(now));
    }

    #[test]
    fn debug_hides_secrets() {
        let entry = Entry::new("bank").with_password("s3cr3t");
        let shown = format!("{entry:?}");
        assert!(shown.contains("bank"));
        assert!(!shown.contains("s3cr3t"));
    }
}
