// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session engine for Strongroom.
//!
//! Owns the time-bounded unlocked state, splits interactive lines into
//! chained sub-commands, expands named scripts and runs chains one step at
//! a time against a [`Dispatcher`].

pub mod chain;
pub mod runner;
pub mod script;
pub mod session;

pub use chain::{split, tokenize, unquote};
pub use runner::{Dispatcher, StepOutcome, StepReport, run_chain};
pub use script::{Scripts, expand_script, expand_script_chain};
pub use session::{Session, SessionState};
