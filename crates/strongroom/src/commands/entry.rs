// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Login entries: `add`, `show`, `ls`, `rm`, `mv`.

use std::io::Write;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Subcommand};
use strongroom_core::{Collection, StrongroomError};
use strongroom_session::Session;
use strongroom_vault::{Entry, Record};
use strongroom_vault::path::normalize_prefix;

use super::{CommandDispatcher, field, print_records, remove_path};

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    /// Add a login entry.
    Add(AddEntryArgs),
    /// Show an entry.
    Show { name: String },
    /// List entries, optionally under a folder. Expired entries are marked.
    Ls { folder: Option<String> },
    /// Remove an entry, or every entry under a folder ending in `/`.
    Rm { name: String },
    /// Rename an entry.
    Mv { old: String, new: String },
}

#[derive(Args, Debug)]
pub struct AddEntryArgs {
    pub name: String,
    #[arg(short, long)]
    pub username: Option<String>,
    #[arg(short, long)]
    pub password: Option<String>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Expiry date, YYYY-MM-DD.
    #[arg(short, long, value_parser = parse_expiry)]
    pub expires: Option<DateTime<Utc>>,
}

impl AddEntryArgs {
    fn into_entry(self) -> Entry {
        let mut entry = Entry::new(self.name);
        if let Some(username) = self.username {
            entry = entry.with_username(username);
        }
        if let Some(password) = self.password {
            entry = entry.with_password(password);
        }
        if let Some(url) = self.url {
            entry = entry.with_url(url);
        }
        if let Some(notes) = self.notes {
            entry = entry.with_notes(notes);
        }
        if let Some(expires) = self.expires {
            entry = entry.with_expiry(expires);
        }
        entry
    }
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::default()).and_utc())
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

pub(super) async fn execute<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    session: &Session,
    command: EntryCommand,
) -> Result<(), StrongroomError> {
    let vault = dispatcher.vault;
    match command {
        EntryCommand::Add(args) => {
            let path = vault.create(session, &args.into_entry()).await?;
            dispatcher.say(format_args!("added {path}"))
        }
        EntryCommand::Show { name } => {
            let entry: Entry = vault.get(session, &name).await?;
            let now = Utc::now();
            field(dispatcher, "Name", &entry.name)?;
            field(dispatcher, "Username", &entry.username)?;
            field(dispatcher, "Password", &entry.password)?;
            field(dispatcher, "URL", &entry.url)?;
            field(dispatcher, "Notes", &entry.notes)?;
            if let Some(expires) = entry.expires {
                let marker = if entry.is_expired(now) { " (expired)" } else { "" };
                let date = expires.format("%Y-%m-%d");
                field(dispatcher, "Expires", &format!("{date}{marker}"))?;
            }
            Ok(())
        }
        EntryCommand::Ls { folder } => {
            let prefix = folder.as_deref().map(normalize_prefix).transpose()?;
            let now = Utc::now();
            let records = vault.list::<Entry, _>(session).await?;
            print_records(dispatcher, records, prefix.as_deref(), |entry| {
                entry.is_expired(now).then(|| "expired".to_string())
            })
        }
        EntryCommand::Rm { name } => remove_path(dispatcher, Collection::Entries, &name).await,
        EntryCommand::Mv { old, new } => {
            let mut entry: Entry = vault.get(session, &old).await?;
            entry.set_path(new);
            let path = vault.update(session, &old, &entry).await?;
            dispatcher.say(format_args!("renamed to {path}"))
        }
    }
}
