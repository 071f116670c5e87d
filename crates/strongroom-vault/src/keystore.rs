// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master key custody.
//!
//! The KeyStore is the only holder of key material. A password is checked by
//! deriving a candidate key and opening a canary envelope stored next to the
//! salt; the derived key itself is never persisted. Callers outside this
//! crate reach the key only through [`KeyAccess::with_key`], which lends it
//! for the duration of a closure.

use strongroom_core::StrongroomError;
use tracing::debug;

use crate::crypto::{self, Envelope};
use crate::kdf::{self, KdfParams, SALT_LEN};
use crate::memory::MasterKey;

/// Known plaintext sealed under the master key at vault creation.
pub(crate) const CANARY_PLAINTEXT: &[u8] = b"strongroom/canary/v1";

/// Everything needed to re-derive and verify the master key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHeader {
    pub salt: [u8; SALT_LEN],
    pub params: KdfParams,
    /// Canary sealed under the master key.
    pub canary: Envelope,
}

impl KeyHeader {
    /// Build a fresh header for `password`, returning the derived key too.
    pub fn generate(
        password: &[u8],
        params: KdfParams,
    ) -> Result<(MasterKey, KeyHeader), StrongroomError> {
        let salt = kdf::generate_salt()?;
        let key = kdf::derive_key(password, &salt, &params)?;
        let canary = crypto::encrypt(&key, CANARY_PLAINTEXT)?;
        Ok((
            key,
            KeyHeader {
                salt,
                params,
                canary,
            },
        ))
    }
}

/// Scoped access to a resident master key.
pub trait KeyAccess {
    /// Run `f` with the current key. Fails with `SessionLocked` when no key
    /// is resident. The borrow cannot escape the closure.
    fn with_key<R>(&self, f: impl FnOnce(&MasterKey) -> R) -> Result<R, StrongroomError>;
}

/// Derives, verifies and holds the master key.
pub struct KeyStore {
    header: KeyHeader,
    key: Option<MasterKey>,
}

impl KeyStore {
    /// A locked store for an existing vault header.
    pub fn new(header: KeyHeader) -> Self {
        Self { header, key: None }
    }

    /// A store that is already unlocked with `key`.
    pub(crate) fn unlocked(header: KeyHeader, key: MasterKey) -> Self {
        Self {
            header,
            key: Some(key),
        }
    }

    pub fn header(&self) -> &KeyHeader {
        &self.header
    }

    /// Apply the KDF with the header's stored parameters.
    pub fn derive(&self, password: &[u8]) -> Result<MasterKey, StrongroomError> {
        kdf::derive_key(password, &self.header.salt, &self.header.params)
    }

    /// Derive a candidate key and check it against the canary.
    ///
    /// Any failure to open the canary is reported as `AuthFailure`; the
    /// candidate is dropped (and zeroed) before returning.
    pub fn verify(&self, password: &[u8]) -> Result<MasterKey, StrongroomError> {
        let candidate = self.derive(password)?;
        match crypto::decrypt(&candidate, &self.header.canary) {
            Ok(plaintext) if plaintext.as_slice() == CANARY_PLAINTEXT => Ok(candidate),
            _ => {
                drop(candidate);
                debug!("master password rejected");
                Err(StrongroomError::AuthFailure)
            }
        }
    }

    /// Verify `password` and keep the key resident on success.
    pub fn unlock(&mut self, password: &[u8]) -> Result<(), StrongroomError> {
        let key = self.verify(password)?;
        self.wipe();
        self.key = Some(key);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.key.is_some()
    }

    /// Zero and release the resident key, if any. Idempotent.
    pub fn wipe(&mut self) {
        if self.key.take().is_some() {
            debug!("master key wiped");
        }
    }

    /// Replace header and key after a password change.
    pub fn install(&mut self, header: KeyHeader, key: MasterKey) {
        self.wipe();
        self.header = header;
        self.key = Some(key);
    }
}

impl KeyAccess for KeyStore {
    fn with_key<R>(&self, f: impl FnOnce(&MasterKey) -> R) -> Result<R, StrongroomError> {
        self.key.as_ref().map(f).ok_or(StrongroomError::SessionLocked)
    }
}

impl Drop for KeyStore {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("params", &self.header.params)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
