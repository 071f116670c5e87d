// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in session commands.
//!
//! Every sub-command of a chain arrives here as an argument vector, is parsed
//! with clap and executed against the [`Vault`] using the [`Session`] for key
//! access.

mod card;
mod config;
mod entry;
mod note;
mod script;
mod totp;

use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use async_trait::async_trait;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use strongroom_config::StrongroomConfig;
use strongroom_core::{Collection, StrongroomError};
use strongroom_session::{Dispatcher, Session, StepOutcome, run_chain};
use strongroom_vault::path::{FOLDER_DELIMITER, normalize, normalize_prefix};
use strongroom_vault::{KdfParams, Record, RecordIter, Vault};
use tracing::debug;

pub use card::CardCommand;
pub use config::{ConfigArgs, ConfigCommand};
pub use entry::{AddEntryArgs, EntryCommand};
pub use note::NoteCommand;
pub use script::ScriptCommand;
pub use totp::TotpCommand;

/// One sub-command of a session line.
#[derive(Parser, Debug)]
#[command(
    name = "strongroom",
    no_binary_name = true,
    disable_version_flag = true,
    subcommand_required = true
)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    #[command(flatten)]
    Entry(EntryCommand),
    /// Manage payment cards.
    #[command(subcommand)]
    Card(CardCommand),
    /// Manage secure notes.
    #[command(subcommand)]
    Note(NoteCommand),
    /// Manage one-time password seeds.
    #[command(subcommand)]
    Totp(TotpCommand),
    /// Show how many records each collection holds.
    Stats,
    /// Print the effective configuration.
    Config(ConfigArgs),
    /// Manage stored session scripts.
    #[command(subcommand)]
    Script(ScriptCommand),
    /// Run a script by name.
    Run {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Change the master password and re-encrypt every record.
    Passwd,
    /// Lock the session now.
    Logout,
    /// Show the time left before the session locks.
    Timeout,
    /// Lock the session and leave the shell.
    Exit,
}

/// Source of passwords and answers for commands that need one.
pub trait Prompter: Send {
    fn current_password(&mut self) -> Result<SecretString, StrongroomError>;
    fn new_password(&mut self) -> Result<SecretString, StrongroomError>;
    /// Ask a yes/no question; anything but an explicit yes is a no.
    fn confirm(&mut self, question: &str) -> Result<bool, StrongroomError>;
}

/// Reads passwords from `STRONGROOM_MASTER_PASSWORD` or the terminal, and
/// answers from one line of stdin.
#[derive(Debug, Default)]
pub struct TtyPrompter;

impl Prompter for TtyPrompter {
    fn current_password(&mut self) -> Result<SecretString, StrongroomError> {
        strongroom_vault::get_master_password()
    }

    fn new_password(&mut self) -> Result<SecretString, StrongroomError> {
        strongroom_vault::get_new_master_password_with_confirm()
    }

    fn confirm(&mut self, question: &str) -> Result<bool, StrongroomError> {
        eprint!("{question} [y/N] ");
        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| StrongroomError::Internal(format!("failed to read answer: {e}")))?;
        Ok(is_yes(&answer))
    }
}

/// `y` or `yes` in any case. EOF reads as an empty answer.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Parse one argument vector. `--help` output comes back as `Ok(None)`
/// after being written to `out`.
pub fn parse_command(
    argv: &[String],
    out: &mut impl Write,
) -> Result<Option<SessionCommand>, StrongroomError> {
    match CommandLine::try_parse_from(argv) {
        Ok(line) => Ok(Some(line.command)),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp) => {
            write_out(out, format_args!("{}", err.render()))?;
            Ok(None)
        }
        Err(err) => Err(StrongroomError::Usage(err.render().to_string().trim_end().to_string())),
    }
}

/// Executes session commands against one vault.
pub struct CommandDispatcher<'v, W> {
    vault: &'v Vault,
    config: StrongroomConfig,
    kdf: KdfParams,
    configured_scripts: BTreeSet<String>,
    prompter: Box<dyn Prompter>,
    out: W,
    exit_requested: bool,
}

impl<'v, W: Write + Send> CommandDispatcher<'v, W> {
    /// Scripts named in `config` are owned by the file; `script add|rm`
    /// refuses them. New keys are derived with `config.kdf`.
    pub fn new(
        vault: &'v Vault,
        config: StrongroomConfig,
        prompter: Box<dyn Prompter>,
        out: W,
    ) -> Self {
        Self {
            vault,
            kdf: KdfParams::from(&config.kdf),
            configured_scripts: config.session.scripts.keys().cloned().collect(),
            config,
            prompter,
            out,
            exit_requested: false,
        }
    }

    /// True once `exit` ran.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    async fn execute(
        &mut self,
        session: &Session,
        command: SessionCommand,
    ) -> Result<(), StrongroomError> {
        match command {
            SessionCommand::Entry(cmd) => entry::execute(self, session, cmd).await,
            SessionCommand::Card(cmd) => card::execute(self, session, cmd).await,
            SessionCommand::Note(cmd) => note::execute(self, session, cmd).await,
            SessionCommand::Totp(cmd) => totp::execute(self, session, cmd).await,
            SessionCommand::Script(cmd) => script::execute(self, session, cmd).await,
            SessionCommand::Config(args) => config::execute(self, args).await,
            SessionCommand::Stats => {
                let stats = self.vault.stats().await?;
                for (collection, count) in stats {
                    self.say(format_args!("{collection}: {count}"))?;
                }
                Ok(())
            }
            SessionCommand::Run { name, args } => self.run_script(session, &name, &args).await,
            SessionCommand::Passwd => {
                let current = self.prompter.current_password()?;
                session.verify_password(&current)?;
                let new = self.prompter.new_password()?;
                let count = session.change_password(self.vault, &new, self.kdf).await?;
                self.say(format_args!(
                    "master password changed, {count} records re-encrypted"
                ))
            }
            SessionCommand::Logout => {
                session.logout();
                self.say(format_args!("logged out"))
            }
            SessionCommand::Timeout => match (session.remaining(), session.timeout()) {
                (Some(left), _) => {
                    let secs = left.as_secs();
                    self.say(format_args!(
                        "session locks in {}m{:02}s",
                        secs / 60,
                        secs % 60
                    ))
                }
                (None, None) => self.say(format_args!("session never expires")),
                (None, Some(_)) => Err(StrongroomError::SessionLocked),
            },
            SessionCommand::Exit => {
                self.exit_requested = true;
                session.lock();
                Ok(())
            }
        }
    }

    /// Expand `name` and run its steps. Scripts may not start other scripts.
    async fn run_script(
        &mut self,
        session: &Session,
        name: &str,
        args: &[String],
    ) -> Result<(), StrongroomError> {
        let steps = session.scripts().expand(name, args)?;
        debug!(script = name, steps = steps.len(), "running script");

        let reports = {
            let mut nested = ScriptSteps(&mut *self);
            run_chain(&mut nested, session, steps).await
        };
        let mut first_error = None;
        for report in reports {
            match report.outcome {
                StepOutcome::Completed => {}
                StepOutcome::Cancelled => {
                    self.say(format_args!("cancelled: {}", report.argv.join(" ")))?;
                }
                StepOutcome::Failed(err) => {
                    self.say(format_args!("{}: {err}", report.argv.join(" ")))?;
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn say(&mut self, line: std::fmt::Arguments<'_>) -> Result<(), StrongroomError> {
        write_out(&mut self.out, format_args!("{line}\n"))
    }
}

#[async_trait]
impl<W: Write + Send> Dispatcher for CommandDispatcher<'_, W> {
    async fn dispatch(
        &mut self,
        session: &Session,
        argv: &[String],
    ) -> Result<(), StrongroomError> {
        match parse_command(argv, &mut self.out)? {
            Some(command) => self.execute(session, command).await,
            None => Ok(()),
        }
    }
}

/// Dispatcher for the steps of an expanded script.
struct ScriptSteps<'d, 'v, W>(&'d mut CommandDispatcher<'v, W>);

#[async_trait]
impl<W: Write + Send> Dispatcher for ScriptSteps<'_, '_, W> {
    async fn dispatch(
        &mut self,
        session: &Session,
        argv: &[String],
    ) -> Result<(), StrongroomError> {
        match parse_command(argv, &mut self.0.out)? {
            Some(SessionCommand::Run { .. }) => Err(StrongroomError::Usage(
                "scripts cannot run other scripts".to_string(),
            )),
            Some(command) => self.0.execute(session, command).await,
            None => Ok(()),
        }
    }
}

fn write_out(out: &mut impl Write, args: std::fmt::Arguments<'_>) -> Result<(), StrongroomError> {
    out.write_fmt(args)
        .map_err(|e| StrongroomError::Internal(format!("failed to write output: {e}")))
}

/// Remove one record, or a whole folder when `name` ends with the delimiter.
async fn remove_path<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    collection: Collection,
    name: &str,
) -> Result<(), StrongroomError> {
    if name.ends_with(FOLDER_DELIMITER) {
        let prefix = normalize_prefix(name)?;
        if !dispatcher
            .prompter
            .confirm(&format!("remove every {collection} record under {prefix}?"))?
        {
            return dispatcher.say(format_args!("aborted"));
        }
        let removed = dispatcher.vault.remove_prefix(collection, &prefix).await?;
        dispatcher.say(format_args!("removed {removed} records under {prefix}"))
    } else {
        let path = normalize(name)?;
        if !dispatcher.vault.exists(collection, &path).await? {
            return Err(StrongroomError::NotFound { collection, path });
        }
        if !dispatcher.prompter.confirm(&format!("remove {path}?"))? {
            return dispatcher.say(format_args!("aborted"));
        }
        dispatcher.vault.remove(collection, &path).await?;
        dispatcher.say(format_args!("removed {path}"))
    }
}

/// Paths in `collection` under an optional folder filter.
async fn list_names<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    collection: Collection,
    folder: Option<&str>,
) -> Result<(), StrongroomError> {
    let prefix = folder.map(normalize_prefix).transpose()?;
    let names = dispatcher.vault.list_names(collection).await?;
    for name in names
        .iter()
        .filter(|name| prefix.as_deref().is_none_or(|p| name.starts_with(p)))
    {
        dispatcher.say(format_args!("{name}"))?;
    }
    Ok(())
}

/// Print every record `records` yields, annotated by `describe`. A record
/// that fails to open is reported on its own line; a lock ends the listing.
fn print_records<W, R, F>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    records: RecordIter<'_, Session, R>,
    prefix: Option<&str>,
    mut describe: F,
) -> Result<(), StrongroomError>
where
    W: Write + Send,
    R: Record,
    F: FnMut(&R) -> Option<String>,
{
    for (path, record) in records {
        if prefix.is_some_and(|p| !path.starts_with(p)) {
            continue;
        }
        match record {
            Ok(record) => match describe(&record) {
                Some(note) => dispatcher.say(format_args!("{path} ({note})"))?,
                None => dispatcher.say(format_args!("{path}"))?,
            },
            Err(StrongroomError::SessionLocked) => return Err(StrongroomError::SessionLocked),
            Err(err) => dispatcher.say(format_args!("{path}: {err}"))?,
        }
    }
    Ok(())
}

/// Print `label: value` when `value` is non-empty.
fn field<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    label: &str,
    value: &str,
) -> Result<(), StrongroomError> {
    if value.is_empty() {
        return Ok(());
    }
    dispatcher.say(format_args!("{label:<10} {value}"))
}
