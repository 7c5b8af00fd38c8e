//! Retry middleware for transient transport failures.
//!
//! Wraps the request dispatch service and re-sends a request when the
//! attempt failed at the network level.
//!
//! # Retry Conditions
//!
//! - Connection, timeout and body-stream failures (see [`GowaError::is_transient`])
//!
//! Gateway status errors (4xx/5xx), decode failures and local upload
//! failures are returned immediately.
//!
//! # Non-Idempotent Requests
//!
//! The gateway's POST endpoints are retried by default, matching how the
//! client is used against it. A retried `send/message` can deliver twice if
//! the first attempt reached the gateway but its response was lost. Use
//! [`RetryPolicy::with_retry_non_idempotent`] with `false` to send
//! POST/PUT/PATCH requests exactly once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::sleep;
use tower::{Layer, Service};

use crate::error::GowaError;
use crate::utils::backoff_delay;

pub(crate) const DEFAULT_MIN_WAIT_MS: u64 = 200;
pub(crate) const DEFAULT_MAX_WAIT_MS: u64 = 2_000;
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Backoff and retry budget for one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    min_wait: Duration,
    max_wait: Duration,
    max_retries: u32,
    retry_non_idempotent: bool,
}

impl RetryPolicy {
    /// Default: min_wait = 200ms, max_wait = 2s, max_retries = 3, retry_non_idempotent = true
    pub fn new() -> Self {
        Self {
            min_wait: Duration::from_millis(DEFAULT_MIN_WAIT_MS),
            max_wait: Duration::from_millis(DEFAULT_MAX_WAIT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_non_idempotent: true,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new().with_max_retries(0)
    }

    /// Set the shortest wait between attempts.
    pub fn with_min_wait(mut self, wait: Duration) -> Self {
        self.min_wait = wait;
        self
    }

    /// Set the longest wait between attempts.
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// Set how many times a failed request is re-sent.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Allow or forbid retrying POST/PUT/PATCH requests.
    pub fn with_retry_non_idempotent(mut self, retry: bool) -> Self {
        self.retry_non_idempotent = retry;
        self
    }

    pub fn min_wait(&self) -> Duration {
        self.min_wait
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_non_idempotent(&self) -> bool {
        self.retry_non_idempotent
    }

    /// Wait before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        backoff_delay(self.min_wait, self.max_wait, retry)
    }

    fn allows<R: RetryableRequest>(&self, req: &R) -> bool {
        self.max_retries > 0 && (req.is_idempotent() || self.retry_non_idempotent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// A request that knows whether re-sending it is safe.
pub trait RetryableRequest {
    /// Returns true if the request is idempotent (GET, DELETE, etc.)
    fn is_idempotent(&self) -> bool;
}

impl RetryableRequest for reqwest::Request {
    fn is_idempotent(&self) -> bool {
        !matches!(
            self.method(),
            &reqwest::Method::POST | &reqwest::Method::PUT | &reqwest::Method::PATCH
        )
    }
}

/// Middleware that retries requests failing with transient errors.
#[derive(Debug, Clone, Default)]
pub struct RetryMiddleware {
    policy: RetryPolicy,
}

impl RetryMiddleware {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Check if an error is retryable.
    ///
    /// Delegates to [`GowaError::is_transient()`].
    pub fn is_retryable_error(error: &GowaError) -> bool {
        error.is_transient()
    }
}

impl<S> Layer<S> for RetryMiddleware {
    type Service = RetryMiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryMiddlewareService {
            inner,
            policy: self.policy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryMiddlewareService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S, R> Service<R> for RetryMiddlewareService<S>
where
    S: Service<R, Error = GowaError> + Send + Clone + 'static,
    S::Future: Send,
    S::Response: Send,
    R: Send + Clone + RetryableRequest + 'static,
{
    type Response = S::Response;
    type Error = GowaError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        let mut inner = self.inner.clone();
        let policy = self.policy;

        Box::pin(async move {
            if !policy.allows(&req) {
                return inner.call(req).await;
            }

            let mut retry = 0;
            loop {
                match inner.call(req.clone()).await {
                    Ok(response) => return Ok(response),
                    Err(e) if retry < policy.max_retries && RetryMiddleware::is_retryable_error(&e) => {
                        let delay = policy.delay_for(retry);
                        retry += 1;
                        log::warn!(
                            "[Gowa] request failed: {}; retry {}/{} in {:?}",
                            e,
                            retry,
                            policy.max_retries,
                            delay
                        );
                        sleep(delay).await;
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }
}
