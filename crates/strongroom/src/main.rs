// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strongroom - a local encrypted credential vault.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use strongroom::app::{self, unlock_with};
use strongroom::shell::{self, print_reports};
use strongroom::{CommandDispatcher, TtyPrompter, backup, signal};
use strongroom_config::StrongroomConfig;
use strongroom_core::StrongroomError;
use strongroom_session::run_chain;
use tracing_subscriber::EnvFilter;

/// Strongroom - a local encrypted credential vault.
#[derive(Parser, Debug)]
#[command(name = "strongroom", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new vault.
    Init,
    /// Start an interactive session (the default).
    Session,
    /// Copy the vault file to PATH.
    Backup { path: PathBuf },
    /// Replace the vault file with the backup at PATH.
    Restore { path: PathBuf },
    /// Any session command, run once, e.g. `strongroom ls work`.
    #[command(external_subcommand)]
    Command(Vec<String>),
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strongroom={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn load_config(path: Option<&Path>) -> StrongroomConfig {
    let loaded = match path {
        Some(path) => strongroom_config::load_and_validate_path(path),
        None => strongroom_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            strongroom_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Init) => app::run_init(&config).await,
        Some(Commands::Session) | None => run_session(&config).await,
        Some(Commands::Backup { path }) => {
            backup::run_backup(Path::new(&config.storage.database_path), &path).map(|size| {
                eprintln!("Backup complete: {size} bytes written to {}", path.display());
            })
        }
        Some(Commands::Restore { path }) => {
            backup::run_restore(Path::new(&config.storage.database_path), &path).map(|size| {
                eprintln!("Restore complete: {size} bytes restored from {}", path.display());
            })
        }
        Some(Commands::Command(argv)) => run_once(&config, argv).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

async fn run_session(config: &StrongroomConfig) -> Result<(), StrongroomError> {
    let vault = app::open_vault(config).await?;
    let session = app::open_session(config, &vault).await?;

    let shutdown = signal::install_signal_handler();
    signal::lock_on_shutdown(session.clone(), shutdown.clone());

    let result = shell::run_shell(config, &vault, &session, shutdown).await;
    vault.close().await?;
    result
}

/// Unlock, run one command line given on the process command line, lock.
async fn run_once(config: &StrongroomConfig, argv: Vec<String>) -> Result<(), StrongroomError> {
    let vault = app::open_vault(config).await?;
    let session = app::open_session(config, &vault).await?;
    let steps = shell::steps_from_tokens(&session, argv)?;

    unlock_with(&session, strongroom_vault::get_master_password)?;
    let mut dispatcher =
        CommandDispatcher::new(&vault, config.clone(), Box::new(TtyPrompter), std::io::stdout());
    let reports = run_chain(&mut dispatcher, &session, steps).await;
    session.lock();
    drop(dispatcher);
    vault.close().await?;

    if !print_reports(&reports, &mut std::io::stderr()) {
        std::process::exit(1);
    }
    Ok(())
}
