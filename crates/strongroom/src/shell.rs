// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongroom session` command implementation.
//!
//! An interactive REPL over one unlocked session. Each line is split into
//! chained sub-commands (or expanded from a script when its first word names
//! one) and run step by step. A locked session is unlocked again before the
//! next line runs.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use strongroom_config::StrongroomConfig;
use strongroom_core::StrongroomError;
use strongroom_session::{Dispatcher, Session, StepOutcome, StepReport, run_chain, split, tokenize};
use strongroom_vault::Vault;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::unlock_with;
use crate::commands::{CommandDispatcher, TtyPrompter};

/// A leading program name is ignored, so pasted `strongroom ls` works.
pub const PROGRAM_TOKEN: &str = "strongroom";

/// Turn already-split words into chain steps. When the first word names a
/// script, the rest of the words are its arguments.
pub fn steps_from_tokens(
    session: &Session,
    mut tokens: Vec<String>,
) -> Result<Vec<Vec<String>>, StrongroomError> {
    if tokens.first().is_some_and(|t| t == PROGRAM_TOKEN) {
        tokens.remove(0);
    }
    let Some(first) = tokens.first() else {
        return Ok(Vec::new());
    };
    let scripts = session.scripts();
    if scripts.contains(first) {
        debug!(script = %first, "expanding script");
        return scripts.expand(first, &tokens[1..]);
    }
    split(&tokens)
}

/// Steps for one line of input.
pub fn steps_from_line(session: &Session, line: &str) -> Result<Vec<Vec<String>>, StrongroomError> {
    steps_from_tokens(session, tokenize(line))
}

/// Run every step of `line`. Errors only when the line itself cannot be
/// split; per-step failures are in the reports.
pub async fn run_line<D>(
    dispatcher: &mut D,
    session: &Session,
    line: &str,
) -> Result<Vec<StepReport>, StrongroomError>
where
    D: Dispatcher + ?Sized,
{
    let steps = steps_from_line(session, line)?;
    Ok(run_chain(dispatcher, session, steps).await)
}

/// Print failed and cancelled steps. Returns true when every step completed.
pub fn print_reports(reports: &[StepReport], err: &mut impl Write) -> bool {
    let mut clean = true;
    for report in reports {
        let command = report.argv.join(" ");
        let line = match &report.outcome {
            StepOutcome::Completed => continue,
            StepOutcome::Failed(e) => format!("{}: {command}: {e}", "error".red()),
            StepOutcome::Cancelled => format!("{}: {command}", "cancelled".yellow()),
        };
        clean = false;
        // Nothing useful can be done if stderr is gone.
        let _ = writeln!(err, "{line}");
    }
    clean
}

fn prompt_text(prefix: &str, session: &Session) -> String {
    let status = if !session.is_unlocked() {
        " [locked]".red().to_string()
    } else {
        match session.remaining() {
            Some(left) => format!(" [{}]", format_remaining(left)).dimmed().to_string(),
            None => String::new(),
        }
    };
    format!("{}{status}> ", prefix.green())
}

fn format_remaining(left: Duration) -> String {
    let secs = left.as_secs();
    if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Runs the interactive session until `exit`, EOF or `shutdown` fires.
pub async fn run_shell(
    config: &StrongroomConfig,
    vault: &Vault,
    session: &Session,
    shutdown: CancellationToken,
) -> Result<(), StrongroomError> {
    unlock_with(session, strongroom_vault::get_master_password)?;

    let mut editor = DefaultEditor::new()
        .map_err(|e| StrongroomError::Internal(format!("failed to start line editor: {e}")))?;
    let mut dispatcher =
        CommandDispatcher::new(vault, config.clone(), Box::new(TtyPrompter), std::io::stdout());

    info!("session started");
    let result = loop {
        if shutdown.is_cancelled() {
            break Ok(());
        }
        let line = match editor.readline(&prompt_text(&config.session.prefix, session)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break Ok(()),
            Err(e) => break Err(StrongroomError::Internal(format!("readline error: {e}"))),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // In-memory history only; lines may carry secrets.
        let _ = editor.add_history_entry(line);

        if !session.is_unlocked() {
            eprintln!("{}", "session locked".yellow());
            if let Err(e) = unlock_with(session, strongroom_vault::get_master_password) {
                break Err(e);
            }
        }

        match run_line(&mut dispatcher, session, line).await {
            Ok(reports) => {
                print_reports(&reports, &mut std::io::stderr());
            }
            Err(e) => eprintln!("{}: {e}", "error".red()),
        }
        if dispatcher.exit_requested() {
            break Ok(());
        }
    };

    session.lock();
    info!("session ended");
    result
}

#[cfg(test)]
mod tests {
    use strongroom_session::Scripts;
    use strongroom_vault::{KdfParams, KeyHeader, KeyStore};

    use super::*;

    fn session_with(scripts: &[(&str, &str)]) -> Session {
        let params = KdfParams {
            memory_cost: 8192,
            iterations: 1,
            parallelism: 1,
        };
        let (_, header) = KeyHeader::generate(b"pw", params).unwrap();
        let mut book = Scripts::default();
        for (name, template) in scripts {
            book.insert(*name, *template);
        }
        Session::new(KeyStore::new(header), None, book)
    }

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_line_is_split_on_the_operator() {
        let session = session_with(&[]);
        assert_eq!(
            steps_from_line(&session, "stats && gen -l 15 && config argon2").unwrap(),
            [v(&["stats"]), v(&["gen", "-l", "15"]), v(&["config", "argon2"])]
        );
    }

    #[test]
    fn program_name_is_dropped() {
        let session = session_with(&[]);
        assert_eq!(
            steps_from_line(&session, "strongroom ls work").unwrap(),
            [v(&["ls", "work"])]
        );
    }

    #[test]
    fn first_word_naming_a_script_expands_it() {
        let session = session_with(&[("login", "show $1 && totp code $1")]);
        assert_eq!(
            steps_from_line(&session, "login github").unwrap(),
            [v(&["show", "github"]), v(&["totp", "code", "github"])]
        );
    }

    #[test]
    fn blank_line_has_no_steps() {
        let session = session_with(&[]);
        assert!(steps_from_line(&session, "   ").unwrap().is_empty());
        assert!(steps_from_line(&session, "strongroom").unwrap().is_empty());
    }

    #[test]
    fn unterminated_quote_rejects_the_line() {
        let session = session_with(&[]);
        assert!(matches!(
            steps_from_line(&session, "note add x \"open"),
            Err(StrongroomError::UnterminatedQuote)
        ));
    }

    #[test]
    fn reports_print_only_problems() {
        colored::control::set_override(false);
        let reports = vec![
            StepReport {
                argv: v(&["stats"]),
                outcome: StepOutcome::Completed,
            },
            StepReport {
                argv: v(&["show", "x"]),
                outcome: StepOutcome::Failed(StrongroomError::SessionLocked),
            },
            StepReport {
                argv: v(&["ls"]),
                outcome: StepOutcome::Cancelled,
            },
        ];
        let mut err = Vec::new();
        assert!(!print_reports(&reports, &mut err));
        let text = String::from_utf8(err).unwrap();
        assert_eq!(text, "error: show x: session is locked\ncancelled: ls\n");
    }

    #[test]
    fn remaining_time_is_coarse() {
        assert_eq!(format_remaining(Duration::from_secs(125)), "2m");
        assert_eq!(format_remaining(Duration::from_secs(42)), "42s");
    }
}
