// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Write;
use std::time::Instant;

use clap::{Args, Subcommand};
use strongroom_core::StrongroomError;
use strongroom_vault::KdfParams;
use strongroom_vault::kdf::{derive_key, generate_salt};
use tracing::debug;

use super::{CommandDispatcher, field};

/// `config` with no sub-command prints the effective configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the Argon2id cost the vault was keyed with.
    Argon2 {
        /// Also time one derivation with the configured cost.
        #[arg(long)]
        bench: bool,
    },
}

pub(super) async fn execute<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    args: ConfigArgs,
) -> Result<(), StrongroomError> {
    match args.command {
        None => {
            let rendered = toml::to_string_pretty(&dispatcher.config)
                .map_err(|e| StrongroomError::Internal(format!("failed to render config: {e}")))?;
            dispatcher.say(format_args!("{}", rendered.trim_end()))
        }
        Some(ConfigCommand::Argon2 { bench }) => {
            let stored = dispatcher.vault.load_key_header().await?.params;
            show_params(dispatcher, &stored)?;

            let configured = KdfParams::from(&dispatcher.config.kdf);
            if configured != stored {
                dispatcher.say(format_args!(
                    "configured cost differs and applies from the next passwd:"
                ))?;
                show_params(dispatcher, &configured)?;
            }
            if bench {
                let elapsed = time_derivation(configured).await?;
                dispatcher.say(format_args!("derivation took {} ms", elapsed.as_millis()))?;
            }
            Ok(())
        }
    }
}

fn show_params<W: Write + Send>(
    dispatcher: &mut CommandDispatcher<'_, W>,
    params: &KdfParams,
) -> Result<(), StrongroomError> {
    field(dispatcher, "Memory", &format!("{} KiB", params.memory_cost))?;
    field(dispatcher, "Iterations", &params.iterations.to_string())?;
    field(dispatcher, "Threads", &params.parallelism.to_string())
}

/// Derive one throwaway key off the async runtime and report how long it took.
async fn time_derivation(params: KdfParams) -> Result<std::time::Duration, StrongroomError> {
    let elapsed = tokio::task::spawn_blocking(move || -> Result<_, StrongroomError> {
        let salt = generate_salt()?;
        let started = Instant::now();
        let _key = derive_key(b"strongroom-cost-check", &salt, &params)?;
        Ok(started.elapsed())
    })
    .await
    .map_err(|e| StrongroomError::Internal(format!("derivation task failed: {e}")))??;

    debug!(ms = elapsed.as_millis() as u64, "timed key derivation");
    Ok(elapsed)
}
