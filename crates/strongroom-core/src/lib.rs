// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strongroom credential vault.
//!
//! Holds the error taxonomy and the collection identifiers shared by every
//! other crate in the workspace.

pub mod error;
pub mod types;

pub use error::StrongroomError;
pub use types::{CHAIN_OPERATOR, Collection, is_valid_script_name};
