use std::future::Future;
use std::time::Duration;

use crate::error::{MigrateError, Result};
use crate::logging::EventLog;
use crate::resilience::Sleeper;

use super::id::MigrationId;
use super::state::{JobSnapshot, MigrationState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub interval: Duration,
    /// `None` waits until the platform reports a terminal state, however long that takes.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOutcome {
    pub descriptor: String,
    pub polls: u32,
}

/// Polls a job until it succeeds or fails.
///
/// Success returns the outcome; failure (including `FAILED_VALIDATION`) returns
/// [`MigrateError::MigrationFailed`] carrying the platform's reason. Every pending poll
/// is logged with the current state, and organization jobs in the repository phase also
/// log how many repositories are done.
///
/// # Errors
///
/// Returns the job failure, a poll error, or [`MigrateError::WaitTimedOut`] if
/// `options.timeout` is set and elapses first.
pub async fn wait_for_terminal<S, F, Fut, Z>(
    id: &MigrationId,
    mut poll: F,
    options: &WaitOptions,
    sleeper: &Z,
    log: &dyn EventLog,
) -> Result<TerminalOutcome>
where
    S: MigrationState,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobSnapshot<S>>>,
    Z: Sleeper,
{
    let mut snapshot = poll().await?;
    let mut polls = 1;
    let mut waited = Duration::ZERO;

    log.info(&format!(
        "Waiting for {} migration (ID: {id}) to finish...",
        snapshot.descriptor
    ));

    loop {
        let state = snapshot.state;

        if state.is_succeeded() {
            log.success(&format!(
                "Migration {id} succeeded for {}",
                snapshot.descriptor
            ));
            return Ok(TerminalOutcome {
                descriptor: snapshot.descriptor,
                polls,
            });
        }

        if state.is_failed() {
            let reason = snapshot
                .failure_reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| format!("migration ended in state {state}"));
            log.error(&format!(
                "Migration {id} failed for {}. Failure reason: {reason}",
                snapshot.descriptor
            ));
            return Err(MigrateError::MigrationFailed {
                id: id.to_string(),
                reason,
            });
        }

        match snapshot.progress.filter(|_| state.reports_progress()) {
            Some(progress) => log.info(&format!(
                "Migration {id} is {state} - {}/{} repositories completed",
                progress.completed, progress.total
            )),
            None => log.info(&format!(
                "Migration {id} for {} is {state}",
                snapshot.descriptor
            )),
        }

        if let Some(timeout) = options.timeout {
            if waited >= timeout {
                return Err(MigrateError::WaitTimedOut {
                    id: id.to_string(),
                    waited_secs: waited.as_secs(),
                });
            }
        }

        log.info(&format!(
            "Waiting {} seconds...",
            options.interval.as_secs()
        ));
        sleeper.sleep(options.interval).await;
        waited += options.interval;

        snapshot = poll().await?;
        polls += 1;
    }
}
