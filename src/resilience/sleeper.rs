use std::future::Future;
use std::time::Duration;

/// Source of delays for polling and backoff.
///
/// Production code sleeps on the tokio timer; tests swap in an implementation
/// that returns immediately and remembers what it was asked to wait.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl<S: Sleeper> Sleeper for &S {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        (**self).sleep(duration)
    }
}
