// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential execution of a split command chain.

use async_trait::async_trait;
use strongroom_core::StrongroomError;
use tracing::{debug, warn};

use crate::session::Session;

/// Executes one sub-command. Implemented by the command layer.
#[async_trait]
pub trait Dispatcher: Send {
    async fn dispatch(
        &mut self,
        session: &Session,
        argv: &[String],
    ) -> Result<(), StrongroomError>;
}

/// What happened to one step of a chain.
#[derive(Debug)]
pub enum StepOutcome {
    Completed,
    Failed(StrongroomError),
    /// Never attempted because an earlier step locked the session or aborted the chain.
    Cancelled,
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StepOutcome::Cancelled)
    }
}

/// One step and its outcome.
#[derive(Debug)]
pub struct StepReport {
    pub argv: Vec<String>,
    pub outcome: StepOutcome,
}

/// Errors after which the rest of the chain is not attempted.
fn aborts_chain(err: &StrongroomError) -> bool {
    matches!(
        err,
        StrongroomError::SessionLocked
            | StrongroomError::ScriptNotFound(_)
            | StrongroomError::UnterminatedQuote
    )
}

/// Run `steps` one after another.
///
/// The session is checked before each step; once it is locked, by logout
/// or by expiry, every remaining step is reported `Cancelled`. A failing
/// step does not stop the chain unless its error is one of the aborting
/// kinds (lock, unknown script, unterminated quote).
pub async fn run_chain<D>(
    dispatcher: &mut D,
    session: &Session,
    steps: Vec<Vec<String>>,
) -> Vec<StepReport>
where
    D: Dispatcher + ?Sized,
{
    let mut reports = Vec::with_capacity(steps.len());
    let mut aborted = false;

    for argv in steps {
        if aborted || !session.is_unlocked() {
            if !aborted {
                debug!("session locked mid-chain, cancelling remaining steps");
            }
            aborted = true;
            reports.push(StepReport {
                argv,
                outcome: StepOutcome::Cancelled,
            });
            continue;
        }

        let outcome = match dispatcher.dispatch(session, &argv).await {
            Ok(()) => StepOutcome::Completed,
            Err(err) => {
                if aborts_chain(&err) {
                    aborted = true;
                }
                let command = argv.first().map(String::as_str).unwrap_or_default();
                warn!(command, error = %err, "chain step failed");
                StepOutcome::Failed(err)
            }
        };
        reports.push(StepReport { argv, outcome });
    }

    reports
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use strongroom_vault::{KdfParams, KeyHeader, KeyStore};
    use tracing_test::traced_test;

    use super::*;
    use crate::chain::split;
    use crate::script::Scripts;

    /// Records every dispatched command; `logout` locks, `fail` errors.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<Vec<String>>,
    }

    #[async_trait]
    impl Dispatcher for Recorder {
        async fn dispatch(
            &mut self,
            session: &Session,
            argv: &[String],
        ) -> Result<(), StrongroomError> {
            self.seen.push(argv.to_vec());
            match argv.first().map(String::as_str) {
                Some("logout") => {
                    session.logout();
                    Ok(())
                }
                Some("fail") => Err(StrongroomError::Internal("boom".into())),
                Some("run") => Err(StrongroomError::ScriptNotFound("missing".into())),
                _ => Ok(()),
            }
        }
    }

    fn unlocked_session(timeout: Option<Duration>) -> Session {
        let params = KdfParams {
            memory_cost: 8192,
            iterations: 1,
            parallelism: 1,
        };
        let (_, header) = KeyHeader::generate(b"pw", params).unwrap();
        let session = Session::new(KeyStore::new(header), timeout, Scripts::default());
        session.unlock(&SecretString::from("pw".to_string())).unwrap();
        session
    }

    #[tokio::test]
    async fn runs_steps_in_order() {
        let session = unlocked_session(None);
        let mut recorder = Recorder::default();
        let steps = split(&["stats", "&&", "ls", "-q"]).unwrap();
        let reports = run_chain(&mut recorder, &session, steps).await;

        assert!(reports.iter().all(|r| r.outcome.is_completed()));
        assert_eq!(recorder.seen, [vec!["stats"], vec!["ls", "-q"]]);
    }

    #[tokio::test]
    async fn logout_cancels_the_rest() {
        let session = unlocked_session(None);
        let mut recorder = Recorder::default();
        let steps = split(&["ls", "&&", "logout", "&&", "show", "a", "&&", "stats"]).unwrap();
        let reports = run_chain(&mut recorder, &session, steps).await;

        let cancelled: Vec<bool> = reports.iter().map(|r| r.outcome.is_cancelled()).collect();
        assert_eq!(cancelled, [false, false, true, true]);
        assert_eq!(recorder.seen.len(), 2);
        assert!(!session.is_unlocked());
    }

    #[tokio::test]
    #[traced_test]
    async fn failure_does_not_stop_the_chain() {
        let session = unlocked_session(None);
        let mut recorder = Recorder::default();
        let steps = split(&["fail", "&&", "ls"]).unwrap();
        let reports = run_chain(&mut recorder, &session, steps).await;

        assert!(matches!(reports[0].outcome, StepOutcome::Failed(_)));
        assert!(reports[1].outcome.is_completed());
        assert!(logs_contain("chain step failed"));
    }

    #[tokio::test]
    async fn unknown_script_aborts_the_chain() {
        let session = unlocked_session(None);
        let mut recorder = Recorder::default();
        let steps = split(&["run", "missing", "&&", "ls"]).unwrap();
        let reports = run_chain(&mut recorder, &session, steps).await;

        assert!(matches!(
            reports[0].outcome,
            StepOutcome::Failed(StrongroomError::ScriptNotFound(_))
        ));
        assert!(reports[1].outcome.is_cancelled());
        assert_eq!(recorder.seen.len(), 1);
    }

    #[tokio::test]
    async fn expiry_mid_chain_cancels_the_rest() {
        let session = unlocked_session(Some(Duration::from_millis(1)));
        tokio::time::sleep(Duration::from_millis(5)).await;
        let mut recorder = Recorder::default();
        let steps = split(&["ls", "&&", "stats"]).unwrap();
        let reports = run_chain(&mut recorder, &session, steps).await;

        assert!(reports.iter().all(|r| r.outcome.is_cancelled()));
        assert!(recorder.seen.is_empty());
    }
}
