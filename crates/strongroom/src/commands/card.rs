// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Write;

use clap::Subcommand;
use strongroom_core::{Collection, StrongroomError};
use strongroom_session::Session;
use strongroom_vault::Card;

use super::{CommandDispatcher, field, list_names, remove_path};

#[derive(Subcommand, Debug)]
pub enum CardCommand {
    /// Add a card.
    Add {
        name: String,
        /// Card type, e.g. "debit".
        #[arg(short, long)]
        kind: Option<String>,
        #[arg(long)]
        number: Option<String>,
        #[arg(long = "code")]
        security_code: Option<String>,
        /// As printed on the card, e.g. "08/29".
        #[arg(short, long = "expires")]
        expire_date: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Show a card.
    Show { name: String },
    /// List cards.
    Ls { folder: Option<String> },
    /// Remove a card or a folder of cards.
    Rm { name: String },
}

pub(super) async fn execute<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    session: &Session,
    command: CardCommand,
) -> Result<(), StrongroomError> {
    let vault = dispatcher.vault;
    match command {
        CardCommand::Add {
            name,
            kind,
            number,
            security_code,
            expire_date,
            notes,
        } => {
            let card = Card::new(name)
                .with_kind(kind.unwrap_or_default())
                .with_number(number.unwrap_or_default())
                .with_security_code(security_code.unwrap_or_default())
                .with_expire_date(expire_date.unwrap_or_default())
                .with_notes(notes.unwrap_or_default());
            let path = vault.create(session, &card).await?;
            dispatcher.say(format_args!("added card {path}"))
        }
        CardCommand::Show { name } => {
            let card: Card = vault.get(session, &name).await?;
            field(dispatcher, "Name", &card.name)?;
            field(dispatcher, "Type", &card.kind)?;
            field(dispatcher, "Number", &card.number)?;
            field(dispatcher, "Code", &card.security_code)?;
            field(dispatcher, "Expires", &card.expire_date)?;
            field(dispatcher, "Notes", &card.notes)
        }
        CardCommand::Ls { folder } => {
            list_names(dispatcher, Collection::Cards, folder.as_deref()).await
        }
        CardCommand::Rm { name } => remove_path(dispatcher, Collection::Cards, &name).await,
    }
}
