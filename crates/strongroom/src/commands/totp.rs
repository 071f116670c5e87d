// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Write;

use clap::Subcommand;
use strongroom_core::{Collection, StrongroomError};
use strongroom_session::Session;
use strongroom_vault::Totp;

use super::{CommandDispatcher, field, list_names, remove_path};

#[derive(Subcommand, Debug)]
pub enum TotpCommand {
    /// Store a base32 seed.
    Add {
        name: String,
        secret: String,
        #[arg(short, long, default_value_t = 6)]
        digits: u32,
    },
    /// Show a seed and its settings.
    Show { name: String },
    /// Print the current code and how long it stays valid.
    Code { name: String },
    /// List seeds.
    Ls { folder: Option<String> },
    /// Remove a seed or a folder of seeds.
    Rm { name: String },
}

pub(super) async fn execute<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    session: &Session,
    command: TotpCommand,
) -> Result<(), StrongroomError> {
    let vault = dispatcher.vault;
    match command {
        TotpCommand::Add {
            name,
            secret,
            digits,
        } => {
            let totp = Totp::new(name, secret).with_digits(digits);
            // Reject seeds that could never produce a code.
            strongroom_vault::totp::generate(&totp, 0)?;
            let path = vault.create(session, &totp).await?;
            dispatcher.say(format_args!("added totp {path}"))
        }
        TotpCommand::Show { name } => {
            let totp: Totp = vault.get(session, &name).await?;
            field(dispatcher, "Name", &totp.name)?;
            field(dispatcher, "Secret", &totp.secret)?;
            field(dispatcher, "Digits", &totp.digits.to_string())?;
            field(dispatcher, "Period", &format!("{}s", totp.period))
        }
        TotpCommand::Code { name } => {
            let totp: Totp = vault.get(session, &name).await?;
            let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
            let code = strongroom_vault::totp::generate(&totp, now)?;
            dispatcher.say(format_args!(
                "{} (expires in {}s)",
                code.code, code.remaining_secs
            ))
        }
        TotpCommand::Ls { folder } => {
            list_names(dispatcher, Collection::Totp, folder.as_deref()).await
        }
        TotpCommand::Rm { name } => remove_path(dispatcher, Collection::Totp, &name).await,
    }
}
