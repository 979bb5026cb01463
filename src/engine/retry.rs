//! # Retry Executor
//!
//! Repeatedly invokes an idempotent operation until it succeeds, fails
//! permanently, or the deadline passes.
//!
//! The operation decides per attempt whether its failure is retryable by
//! returning a [`RetryError`]. [`retry_call`] does that decision for vendor calls
//! through an [`ErrorPolicy`].
//!
//! A retryable failure after the deadline is surfaced wrapped in
//! [`ProviderError::TimeoutExhausted`]. The sleep before the next attempt is
//! capped at the time left, so the executor returns within the deadline plus one
//! backoff interval (plus the duration of the last attempt).

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::classify::{Classification, ErrorPolicy};
use super::context::OperationContext;
use super::error::ProviderError;
use crate::observability::metrics;

/// Failure of a single attempt
#[derive(Debug)]
pub enum RetryError {
    /// Try again after the backoff interval
    Retryable(ProviderError),
    /// Surface immediately
    NonRetryable(ProviderError),
}

impl RetryError {
    #[must_use]
    pub fn into_inner(self) -> ProviderError {
        match self {
            Self::Retryable(err) | Self::NonRetryable(err) => err,
        }
    }
}

/// Mark a failure as retryable
#[must_use]
pub fn retryable(err: ProviderError) -> RetryError {
    RetryError::Retryable(err)
}

/// Mark a failure as permanent
#[must_use]
pub fn non_retryable(err: ProviderError) -> RetryError {
    RetryError::NonRetryable(err)
}

/// Run `op` until it succeeds, fails permanently, or `timeout` elapses
///
/// A zero `timeout` still performs exactly one attempt.
///
/// # Errors
/// - the first non-retryable error, unchanged
/// - [`ProviderError::TimeoutExhausted`] wrapping the last retryable error
/// - [`ProviderError::Cancelled`] if the host cancels between attempts
pub async fn retry<T, F, Fut>(
    ctx: &OperationContext,
    timeout: Duration,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    if ctx.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }

    let deadline = Instant::now() + timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if attempts > 1 {
            metrics::increment_retry_attempts();
        }
        debug!(attempt = attempts, "executing attempt");

        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(err)) => return Err(err),
            Err(RetryError::Retryable(err)) => err,
        };

        let now = Instant::now();
        if now >= deadline {
            warn!(
                attempts,
                code = err.code(),
                "retry deadline exhausted: {}",
                err
            );
            return Err(ProviderError::TimeoutExhausted {
                attempts,
                last: Box::new(err),
            });
        }

        let delay = ctx.backoff().next_delay().min(deadline - now);
        warn!(
            attempt = attempts,
            code = err.code(),
            "retryable error, next attempt in {:?}: {}",
            delay,
            err
        );
        ctx.sleep(delay).await?;
    }
}

/// Retry a vendor call, classifying its failures with `policy`
///
/// Returns `Ok(None)` when the failure is in the policy's ignore set.
///
/// # Errors
/// Same as [`retry`].
pub async fn retry_call<T, F, Fut>(
    ctx: &OperationContext,
    timeout: Duration,
    policy: &ErrorPolicy,
    mut op: F,
) -> Result<Option<T>, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    retry(ctx, timeout, || {
        let attempt = op();
        async move {
            match attempt.await {
                Ok(value) => Ok(Some(value)),
                Err(err) => match policy.classify(&err) {
                    Classification::IgnoreAsSuccess => {
                        debug!(code = err.code(), "ignoring error as success");
                        Ok(None)
                    }
                    Classification::Retryable => Err(retryable(err)),
                    Classification::NonRetryable => Err(non_retryable(err)),
                },
            }
        }
    })
    .await
}
