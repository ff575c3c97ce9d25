use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::logging::EventLog;

use super::retry::Backoff;
use super::sleeper::Sleeper;
use super::transport::{HttpRequest, HttpResponse, Transport};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(900);

const BODY_MARKERS: [&str; 3] = ["secondary rate limit", "abuse detection", "rate limit"];
const BODY_PREVIEW_CHARS: usize = 200;

/// A throttling response, with the cool-down the server asked for if it said one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSignal {
    pub declared_wait: Option<Duration>,
}

/// Recognises a secondary rate limit response.
///
/// 429 always counts. A 403 only counts when the body mentions rate limiting or the
/// rate limit headers say so; other 403s are real permission errors.
pub fn detect(response: &HttpResponse, now: DateTime<Utc>) -> Option<RateLimitSignal> {
    if response.status != 403 && response.status != 429 {
        return None;
    }

    let body = response.body.to_lowercase();
    let mentions_limit = BODY_MARKERS.iter().any(|marker| body.contains(marker));
    let exhausted = response.header("x-ratelimit-remaining") == Some("0");
    let retry_after = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    if response.status == 403 && !mentions_limit && !exhausted && retry_after.is_none() {
        return None;
    }

    let until_reset = if exhausted {
        response
            .header("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
            .and_then(|reset| (reset - now).to_std().ok())
            .filter(|wait| !wait.is_zero())
    } else {
        None
    };

    Some(RateLimitSignal {
        declared_wait: retry_after.or(until_reset),
    })
}

/// Transport wrapper that sits out secondary rate limits and re-sends the same request.
///
/// After `max_attempts` sends the throttled response is handed back as-is; callers turn
/// it into an ordinary failure.
pub struct SecondaryRateLimit<T, S> {
    inner: T,
    sleeper: S,
    log: Arc<dyn EventLog>,
    max_attempts: u32,
    /// Used when the response does not say how long to wait.
    fallback: Backoff,
}

impl<T: Transport, S: Sleeper> SecondaryRateLimit<T, S> {
    pub fn new(inner: T, sleeper: S, log: Arc<dyn EventLog>) -> Self {
        Self {
            inner,
            sleeper,
            log,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fallback: Backoff::Exponential {
                initial: DEFAULT_INITIAL_BACKOFF,
                max: DEFAULT_MAX_BACKOFF,
            },
        }
    }

    pub fn with_limits(
        mut self,
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.fallback = Backoff::Exponential {
            initial: initial_backoff,
            max: max_backoff.max(initial_backoff),
        };
        self
    }
}

impl<T: Transport, S: Sleeper> Transport for SecondaryRateLimit<T, S> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            let response = self.inner.send(request).await?;
            let Some(signal) = detect(&response, Utc::now()) else {
                return Ok(response);
            };

            attempt += 1;
            if attempt >= self.max_attempts {
                self.log.verbose(&format!(
                    "Secondary rate limit persisted after {attempt} attempts (HTTP {})",
                    response.status
                ));
                return Ok(response);
            }

            let wait = signal
                .declared_wait
                .unwrap_or_else(|| self.fallback.delay(attempt));
            let preview: String = response.body.chars().take(BODY_PREVIEW_CHARS).collect();
            self.log.verbose(&format!(
                "Secondary rate limit (HTTP {}). Retrying in {}s (attempt {attempt}). Body={preview}",
                response.status,
                wait.as_secs()
            ));

            self.sleeper.sleep(wait).await;
        }
    }
}
