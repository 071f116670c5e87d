// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command layer of the `strongroom` binary: built-in session commands,
//! the interactive shell, backup/restore and signal handling.

pub mod app;
pub mod backup;
pub mod commands;
pub mod shell;
pub mod signal;

pub use commands::{CommandDispatcher, Prompter, TtyPrompter};
