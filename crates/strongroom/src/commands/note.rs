// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Write;

use clap::Subcommand;
use strongroom_core::{Collection, StrongroomError};
use strongroom_session::Session;
use strongroom_vault::Note;

use super::{CommandDispatcher, list_names, remove_path};

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Add a note. The remaining words form its content.
    Add {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        content: Vec<String>,
    },
    /// Print a note.
    Show { name: String },
    /// List notes.
    Ls { folder: Option<String> },
    /// Remove a note or a folder of notes.
    Rm { name: String },
}

pub(super) async fn execute<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    session: &Session,
    command: NoteCommand,
) -> Result<(), StrongroomError> {
    let vault = dispatcher.vault;
    match command {
        NoteCommand::Add { name, content } => {
            let note = Note::new(name, content.join(" "));
            let path = vault.create(session, &note).await?;
            dispatcher.say(format_args!("added note {path}"))
        }
        NoteCommand::Show { name } => {
            let note: Note = vault.get(session, &name).await?;
            dispatcher.say(format_args!("{}", note.content))
        }
        NoteCommand::Ls { folder } => {
            list_names(dispatcher, Collection::Notes, folder.as_deref()).await
        }
        NoteCommand::Rm { name } => remove_path(dispatcher, Collection::Notes, &name).await,
    }
}
