//! # State-Machine Waiter
//!
//! Polls a resource until its status leaves the operating set.
//!
//! Each poll runs inside the retry executor:
//! - a status in the failure set is a permanent [`ProviderError::TerminalStatus`]
//! - a status in the operating set is retried as [`ProviderError::StillOperating`]
//! - a status in the success set (or any other status when the success set is
//!   empty) ends the wait
//! - a status outside every set is a permanent [`ProviderError::UnexpectedStatus`]
//!
//! An absent resource ends the wait when the caller accepts absence (deletes),
//! otherwise it is retried until the resource becomes visible.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::info;

use super::classify::{Classification, ErrorPolicy};
use super::context::OperationContext;
use super::error::{ProviderError, ProviderResult};
use super::retry::{non_retryable, retry, retryable};
use crate::observability::metrics;

/// What a single status poll observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed<S> {
    Present(S),
    Absent,
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<S> {
    /// Final status of the resource
    Reached(S),
    /// The resource disappeared
    Absent,
}

impl<S> WaitOutcome<S> {
    #[must_use]
    pub fn status(&self) -> Option<&S> {
        match self {
            Self::Reached(status) => Some(status),
            Self::Absent => None,
        }
    }
}

/// Status sets describing one transition of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWaiter<S: Ord> {
    operating: BTreeSet<S>,
    success: BTreeSet<S>,
    failure: BTreeSet<S>,
    accept_absent: bool,
}

impl<S: Ord> Default for StatusWaiter<S> {
    fn default() -> Self {
        Self {
            operating: BTreeSet::new(),
            success: BTreeSet::new(),
            failure: BTreeSet::new(),
            accept_absent: false,
        }
    }
}

impl<S> StatusWaiter<S>
where
    S: Ord + Clone + Display + Send,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn operating(mut self, statuses: impl IntoIterator<Item = S>) -> Self {
        self.operating.extend(statuses);
        self
    }

    #[must_use]
    pub fn success(mut self, statuses: impl IntoIterator<Item = S>) -> Self {
        self.success.extend(statuses);
        self
    }

    #[must_use]
    pub fn failure(mut self, statuses: impl IntoIterator<Item = S>) -> Self {
        self.failure.extend(statuses);
        self
    }

    /// Treat a disappearing resource as the end of the transition
    #[must_use]
    pub fn accept_absent(mut self, accept: bool) -> Self {
        self.accept_absent = accept;
        self
    }

    /// Decide what one observation means for the wait
    fn evaluate<T>(
        &self,
        observed: Observed<T>,
        status: Option<&S>,
    ) -> Result<WaitOutcome<T>, ProviderError> {
        let (resource, status) = match (observed, status) {
            (Observed::Present(resource), Some(status)) => (resource, status),
            _ if self.accept_absent => return Ok(WaitOutcome::Absent),
            _ => {
                return Err(ProviderError::Pending(
                    "resource is not visible yet".to_string(),
                ))
            }
        };

        if self.failure.contains(status) {
            Err(ProviderError::TerminalStatus {
                status: status.to_string(),
            })
        } else if self.operating.contains(status) {
            Err(ProviderError::StillOperating {
                status: status.to_string(),
            })
        } else if self.success.is_empty() || self.success.contains(status) {
            Ok(WaitOutcome::Reached(resource))
        } else {
            Err(ProviderError::UnexpectedStatus {
                status: status.to_string(),
            })
        }
    }

    /// Poll `fetch` until the transition completes or `timeout` elapses
    ///
    /// Fetch errors are classified with the default policy, so transport
    /// failures are retried and everything else is surfaced.
    ///
    /// # Errors
    /// - [`ProviderError::TerminalStatus`] for a status in the failure set
    /// - [`ProviderError::UnexpectedStatus`] for a status outside every set
    /// - [`ProviderError::TimeoutExhausted`] carrying the last observed status
    /// - [`ProviderError::Cancelled`] if the host cancels
    pub async fn wait<F, Fut>(
        &self,
        ctx: &OperationContext,
        timeout: Duration,
        fetch: F,
    ) -> ProviderResult<WaitOutcome<S>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<Observed<S>>>,
    {
        self.wait_for(ctx, timeout, fetch, S::clone).await
    }

    /// Like [`StatusWaiter::wait`], but polls whole resources and returns the
    /// last one observed
    ///
    /// # Errors
    /// Same as [`StatusWaiter::wait`].
    pub async fn wait_for<T, F, Fut, G>(
        &self,
        ctx: &OperationContext,
        timeout: Duration,
        mut fetch: F,
        status_of: G,
    ) -> ProviderResult<WaitOutcome<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<Observed<T>>>,
        G: Fn(&T) -> S,
    {
        let policy = ErrorPolicy::new();
        retry(ctx, timeout, || {
            let poll = fetch();
            let policy = &policy;
            let status_of = &status_of;
            async move {
                metrics::increment_waiter_polls();
                let observed = poll.await.map_err(|err| match policy.classify(&err) {
                    Classification::Retryable => retryable(err),
                    Classification::NonRetryable | Classification::IgnoreAsSuccess => {
                        non_retryable(err)
                    }
                })?;
                let status = match &observed {
                    Observed::Present(resource) => Some(status_of(resource)),
                    Observed::Absent => None,
                };
                match self.evaluate(observed, status.as_ref()) {
                    Ok(outcome) => {
                        match &status {
                            Some(status) => info!(%status, "status reached"),
                            None => info!("resource is gone"),
                        }
                        Ok(outcome)
                    }
                    Err(err @ (ProviderError::StillOperating { .. } | ProviderError::Pending(_))) => {
                        info!("{}", err);
                        Err(retryable(err))
                    }
                    Err(err) => Err(non_retryable(err)),
                }
            }
        })
        .await
    }
}
