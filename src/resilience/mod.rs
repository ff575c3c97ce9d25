//! Retry policies and rate-limit handling wrapped around every remote call.

mod rate_limit;
mod retry;
mod sleeper;
mod transport;

pub use rate_limit::{
    SecondaryRateLimit, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
};
pub use retry::{transient, Attempted, Backoff, RetryPolicy};
pub use sleeper::{Sleeper, TokioSleeper};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

#[cfg(test)]
pub mod testing {
    pub use super::sleeper::testing::InstantSleeper;
    pub use super::transport::testing::{response, ScriptedTransport};
}
