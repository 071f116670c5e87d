// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key custody, record encryption and storage for Strongroom.
//!
//! The master key is derived from the master password with Argon2id and
//! never written to disk; a canary envelope sealed under it lets a later
//! unlock tell a right password from a wrong one. Every record is encrypted
//! with AES-256-GCM under that key before it reaches the SQLite file.

pub mod crypto;
pub mod database;
pub mod kdf;
pub mod keystore;
pub mod memory;
pub mod path;
pub mod prompt;
pub mod record;
pub mod totp;
pub mod vault;

pub use crypto::Envelope;
pub use database::Database;
pub use kdf::KdfParams;
pub use keystore::{KeyAccess, KeyHeader, KeyStore};
pub use memory::MasterKey;
pub use prompt::{get_master_password, get_new_master_password_with_confirm};
pub use record::{Card, Entry, Note, Record, Totp};
pub use vault::{RecordIter, Vault};
