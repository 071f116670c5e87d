// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lock-on-signal handling.
//!
//! SIGINT and SIGTERM cancel a [`CancellationToken`]; a watcher task then
//! wipes the session key before the process exits.

use strongroom_session::Session;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Exit status used after a signal-triggered shutdown.
pub const SIGNAL_EXIT_CODE: i32 = 130;

/// Installs handlers for SIGTERM and SIGINT and returns the token they cancel.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT"),
                        _ = sigterm.recv() => info!("received SIGTERM"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "could not install SIGTERM handler");
                    let _ = ctrl_c.await;
                    info!("received SIGINT");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C");
        }

        trigger.cancel();
    });

    token
}

/// Wait for `token`, then lock `session`.
pub async fn lock_when_cancelled(session: &Session, token: &CancellationToken) {
    token.cancelled().await;
    session.lock();
    info!("session locked on shutdown");
}

/// Lock `session` once `token` is cancelled, then exit the process.
pub fn lock_on_shutdown(session: Session, token: CancellationToken) {
    tokio::spawn(async move {
        lock_when_cancelled(&session, &token).await;
        std::process::exit(SIGNAL_EXIT_CODE);
    });
}
