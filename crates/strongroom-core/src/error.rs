// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strongroom credential vault.

use thiserror::Error;

use crate::types::Collection;

/// The primary error type used across the vault, session and shell layers.
#[derive(Debug, Error)]
pub enum StrongroomError {
    /// Wrong master password. Recoverable: the caller may prompt again.
    #[error("authentication failed: invalid master password")]
    AuthFailure,

    /// An operation needing key material was attempted while locked.
    #[error("session is locked")]
    SessionLocked,

    /// Key derivation parameters were rejected by the KDF.
    #[error("key derivation failed: {0}")]
    KdfFailure(String),

    /// A stored envelope failed authentication. Deliberately carries no detail.
    #[error("decryption failed")]
    DecryptionFailure,

    /// No record exists under the requested path.
    #[error("{path:?} does not exist in {collection}")]
    NotFound { collection: Collection, path: String },

    /// A record already exists under the requested path.
    #[error("{path:?} already exists in {collection}")]
    AlreadyExists { collection: Collection, path: String },

    /// The path is empty or malformed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A decrypted payload carries a format version this build cannot read.
    #[error("unsupported record format version {version}")]
    UnsupportedFormat { version: u8 },

    /// A script invocation named no configured script.
    #[error("script not found: {0}")]
    ScriptNotFound(String),

    /// A quoted span was opened but never closed.
    #[error("unterminated quoted argument")]
    UnterminatedQuote,

    /// Storage engine errors (I/O, SQL, migrations). Never retried internally.
    #[error("storage unavailable: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A session command line that does not parse. Carries the rendered usage text.
    #[error("{0}")]
    Usage(String),

    /// Configuration errors detected after loading.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrongroomError {
    /// Wraps any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// True when re-prompting for the master password makes sense.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailure)
    }
}
