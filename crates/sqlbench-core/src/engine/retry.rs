use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Bounded attempts with a fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as at least one.
    pub times: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(times: u32, delay: Duration) -> Self {
        Self { times, delay }
    }

    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}

/// Runs `f` until it succeeds or the policy is exhausted, returning the last
/// error. Every failed attempt is logged.
pub async fn call_with_retry<T, E, F, Fut>(policy: &RetryPolicy, op: &str, f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    call_with_retry_if(policy, op, |_: &E| true, f).await
}

/// Like [`call_with_retry`], but an error for which `retryable` is false is
/// returned at once.
pub async fn call_with_retry_if<T, E, P, F, Fut>(
    policy: &RetryPolicy,
    op: &str,
    retryable: P,
    mut f: F,
) -> Result<T, E>
where
    P: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max = policy.times.max(1);
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                tracing::warn!(
                    event = "call_retry",
                    op = %op,
                    attempt,
                    max_attempts = max,
                    error = %e,
                    "call failed"
                );
                if attempt >= max || !retryable(&e) {
                    return Err(e);
                }
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
