use std::future::Future;
use std::time::Duration;

use crate::error::{MigrateError, Result};
use crate::logging::EventLog;

use super::sleeper::Sleeper;

const DEFAULT_MAX_ATTEMPTS: u32 = 6;
const HTTP_RETRY_INTERVAL_MS: u64 = 1_000;
const RESULT_RETRY_INTERVAL_MS: u64 = 4_000;

/// How long to wait before the n-th retry (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `n * step`
    Linear(Duration),
    /// `initial * 2^(n-1)`, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        match *self {
            Self::Linear(step) => step.saturating_mul(retry),
            Self::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(retry - 1);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Fail,
}

/// Default classifier: retry transient failures, surface everything else at once.
pub fn transient(err: &MigrateError) -> RetryDecision {
    if err.is_transient() {
        RetryDecision::Retry
    } else {
        RetryDecision::Fail
    }
}

/// Result of [`RetryPolicy::retry_on_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempted<T> {
    Accepted { value: T, attempts: u32 },
    Rejected { attempts: u32 },
}

/// Attempt budget plus backoff. Holds no per-call state, so one policy can guard many calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::http()
    }
}

impl RetryPolicy {
    /// `max_attempts` counts every invocation, the first one included. Zero is treated as one.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy for remote calls: 6 attempts, 1s, 2s, 3s... between them.
    pub fn http() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Backoff::Linear(Duration::from_millis(HTTP_RETRY_INTERVAL_MS)),
        )
    }

    /// Policy for eventually-consistent reads: 6 attempts, 4s, 8s, 12s... between them.
    pub fn eventual() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Backoff::Linear(Duration::from_millis(RESULT_RETRY_INTERVAL_MS)),
        )
    }

    /// Runs `action` until it succeeds, fails fatally, or the attempt budget is spent.
    ///
    /// A failure that `classify` marks as [`RetryDecision::Fail`] is returned immediately.
    /// When the budget runs out on retryable failures the last failure is returned.
    pub async fn retry<T, F, Fut, C, S>(
        &self,
        mut action: F,
        classify: C,
        sleeper: &S,
        log: &dyn EventLog,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&MigrateError) -> RetryDecision,
        S: Sleeper,
    {
        let mut attempt = 1;
        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if classify(&err) == RetryDecision::Fail {
                        return Err(err);
                    }
                    if attempt >= self.max_attempts {
                        log.verbose(&format!(
                            "Giving up after {attempt} attempts: {err}"
                        ));
                        return Err(err);
                    }

                    let delay = self.backoff.delay(attempt);
                    log.verbose(&format!(
                        "Call failed ({err}), retrying in {}ms ({attempt}/{})...",
                        delay.as_millis(),
                        self.max_attempts
                    ));
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Repeats `action` while its value is not acceptable.
    ///
    /// `action` is invoked at most `max_attempts` times. Errors from `action` are not
    /// retried here; wrap the action in [`RetryPolicy::retry`] for that.
    pub async fn retry_on_result<T, F, Fut, P, S>(
        &self,
        mut action: F,
        is_acceptable: P,
        sleeper: &S,
        log: &dyn EventLog,
        waiting_message: &str,
    ) -> Result<Attempted<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&T) -> bool,
        S: Sleeper,
    {
        let mut attempt = 1;
        loop {
            let value = action().await?;
            if is_acceptable(&value) {
                return Ok(Attempted::Accepted {
                    value,
                    attempts: attempt,
                });
            }
            if attempt >= self.max_attempts {
                return Ok(Attempted::Rejected { attempts: attempt });
            }

            log.verbose(waiting_message);
            sleeper.sleep(self.backoff.delay(attempt)).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::logging::testing::RecordingLog;
    use crate::resilience::sleeper::testing::InstantSleeper;

    fn server_error() -> MigrateError {
        MigrateError::ApiError {
            status: 502,
            message: "bad gateway".into(),
        }
    }

    #[test]
    fn test_backoff_delays() {
        let linear = Backoff::Linear(Duration::from_secs(1));
        assert_eq!(linear.delay(1), Duration::from_secs(1));
        assert_eq!(linear.delay(3), Duration::from_secs(3));

        let exp = Backoff::Exponential {
            initial: Duration::from_secs(15),
            max: Duration::from_secs(100),
        };
        assert_eq!(exp.delay(1), Duration::from_secs(15));
        assert_eq!(exp.delay(2), Duration::from_secs(30));
        assert_eq!(exp.delay(3), Duration::from_secs(60));
        assert_eq!(exp.delay(4), Duration::from_secs(100));
        assert_eq!(exp.delay(40), Duration::from_secs(100));

    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let calls = Cell::new(0);
        let sleeper = InstantSleeper::default();
        let log = RecordingLog::default();

        let result = RetryPolicy::http()
            .retry(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 {
                            Err(server_error())
                        } else {
                            Ok("done")
                        }
                    }
                },
                transient,
                &sleeper,
                &log,
            )
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_fatal_failures() {
        let calls = Cell::new(0);
        let sleeper = InstantSleeper::default();
        let log = RecordingLog::default();

        let result: Result<()> = RetryPolicy::http()
            .retry(
                || {
                    calls.set(calls.get() + 1);
                    async { Err(MigrateError::Unauthorized) }
                },
                transient,
                &sleeper,
                &log,
            )
            .await;

        assert!(matches!(result, Err(MigrateError::Unauthorized)));
        assert_eq!(calls.get(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_retry_returns_last_failure_when_budget_is_spent() {
        let calls = Cell::new(0);
        let sleeper = InstantSleeper::default();
        let log = RecordingLog::default();
        let policy = RetryPolicy::new(4, Backoff::Linear(Duration::from_millis(5)));

        let result: Result<()> = policy
            .retry(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        Err(MigrateError::ApiError {
                            status: 500,
                            message: format!("attempt {n}"),
                        })
                    }
                },
                transient,
                &sleeper,
                &log,
            )
            .await;

        match result {
            Err(MigrateError::ApiError { message, .. }) => assert_eq!(message, "attempt 4"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(calls.get(), 4);
        assert_eq!(sleeper.delays().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_on_result_accepts_sixth_value() {
        let calls = Cell::new(0);
        let downloads = Cell::new(0);
        let sleeper = InstantSleeper::default();
        let log = RecordingLog::default();

        let outcome = RetryPolicy::eventual()
            .retry_on_result(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        Ok(if n < 6 {
                            String::new()
                        } else {
                            "https://example.com/log".to_string()
                        })
                    }
                },
                |url: &String| !url.is_empty(),
                &sleeper,
                &log,
                "Waiting for migration log to populate...",
            )
            .await
            .unwrap();

        assert_eq!(calls.get(), 6);
        if let Attempted::Accepted { value, attempts } = outcome {
            downloads.set(downloads.get() + 1);
            assert_eq!(attempts, 6);
            assert_eq!(value, "https://example.com/log");
        }
        assert_eq!(downloads.get(), 1);
        assert_eq!(sleeper.delays().len(), 5);
    }

    #[tokio::test]
    async fn test_retry_on_result_gives_up_without_side_effect() {
        let calls = Cell::new(0);
        let downloads = Cell::new(0);
        let sleeper = InstantSleeper::default();
        let log = RecordingLog::default();

        let outcome = RetryPolicy::eventual()
            .retry_on_result(
                || {
                    calls.set(calls.get() + 1);
                    async { Ok(String::new()) }
                },
                |url: &String| !url.is_empty(),
                &sleeper,
                &log,
                "Waiting for migration log to populate...",
            )
            .await
            .unwrap();

        assert_eq!(calls.get(), 6);
        assert!(matches!(outcome, Attempted::Rejected { attempts: 6, .. }));
        if let Attempted::Accepted { .. } = outcome {
            downloads.set(downloads.get() + 1);
        }
        assert_eq!(downloads.get(), 0);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(
            RetryPolicy::new(0, Backoff::Linear(Duration::ZERO)),
            RetryPolicy::new(1, Backoff::Linear(Duration::ZERO))
        );
    }
}
