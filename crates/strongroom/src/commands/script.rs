// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stored session scripts. Saved in the vault's plaintext scripts
//! collection and mirrored into the running session.

use std::io::Write;

use clap::Subcommand;
use strongroom_core::{CHAIN_OPERATOR, StrongroomError, is_valid_script_name};
use strongroom_session::Session;

use super::CommandDispatcher;

#[derive(Subcommand, Debug)]
pub enum ScriptCommand {
    /// Save a script. Quote the template when it contains `&&`.
    Add {
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        template: Vec<String>,
    },
    /// Delete a stored script.
    Rm { name: String },
    /// List every script the session knows.
    Ls,
}

fn check_name(name: &str) -> Result<(), StrongroomError> {
    if !is_valid_script_name(name) {
        return Err(StrongroomError::Usage(format!(
            "script name {name:?} must be a single token without {CHAIN_OPERATOR:?}"
        )));
    }
    Ok(())
}

pub(super) async fn execute<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    session: &Session,
    command: ScriptCommand,
) -> Result<(), StrongroomError> {
    match command {
        ScriptCommand::Add { name, template } => {
            check_name(&name)?;
            if dispatcher.configured_scripts.contains(&name) {
                return Err(StrongroomError::Config(format!(
                    "script {name:?} is defined in the configuration file"
                )));
            }
            let template = template.join(" ");
            dispatcher.vault.save_script(&name, &template).await?;
            session.set_script(name.clone(), template);
            dispatcher.say(format_args!("saved script {name}"))
        }
        ScriptCommand::Rm { name } => {
            if dispatcher.configured_scripts.contains(&name) {
                return Err(StrongroomError::Config(format!(
                    "script {name:?} is defined in the configuration file"
                )));
            }
            dispatcher.vault.remove_script(&name).await?;
            session.remove_script(&name);
            dispatcher.say(format_args!("removed script {name}"))
        }
        ScriptCommand::Ls => {
            for (name, template) in session.scripts().iter() {
                dispatcher.say(format_args!("{name}: {template}"))?;
            }
            Ok(())
        }
    }
}
