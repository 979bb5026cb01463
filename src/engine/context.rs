//! # Operation Context
//!
//! Per-call state threaded through every lifecycle operation: the host's
//! cancellation token, the host-supplied timeouts and the backoff policy.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::backoff::JitteredBackoff;
use super::error::ProviderError;
use crate::constants::{
    DEFAULT_CREATE_TIMEOUT_SECS, DEFAULT_DELETE_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS,
    DEFAULT_UPDATE_TIMEOUT_SECS, TIMEOUT_SAFETY_MARGIN_SECS,
};

/// Lifecycle operation a deadline is derived for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Host-supplied timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(DEFAULT_CREATE_TIMEOUT_SECS),
            read: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            update: Duration::from_secs(DEFAULT_UPDATE_TIMEOUT_SECS),
            delete: Duration::from_secs(DEFAULT_DELETE_TIMEOUT_SECS),
        }
    }
}

impl Timeouts {
    /// Same timeout for every operation
    #[must_use]
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }

    /// Retry budget for an operation
    ///
    /// Create gets the full host timeout; the others keep a one-minute margin
    /// so the host sees our error before its own deadline fires.
    #[must_use]
    pub fn budget(&self, operation: Operation) -> Duration {
        let margin = Duration::from_secs(TIMEOUT_SAFETY_MARGIN_SECS);
        match operation {
            Operation::Create => self.create,
            Operation::Read => self.read.saturating_sub(margin),
            Operation::Update => self.update.saturating_sub(margin),
            Operation::Delete => self.delete.saturating_sub(margin),
        }
    }
}

/// Deadline shared by the steps of one operation
///
/// A create that calls the vendor, waits and then reads spends one budget
/// across all three steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    /// Time left, zero once passed
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }
}

/// Context for a single host call
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cancel: CancellationToken,
    timeouts: Timeouts,
    backoff: JitteredBackoff,
}

impl OperationContext {
    #[must_use]
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeouts,
            backoff: JitteredBackoff::default(),
        }
    }

    /// Use the host's cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: JitteredBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Retry budget for an operation
    #[must_use]
    pub fn budget(&self, operation: Operation) -> Duration {
        self.timeouts.budget(operation)
    }

    /// Deadline for an operation starting now
    #[must_use]
    pub fn deadline(&self, operation: Operation) -> Deadline {
        Deadline::after(self.budget(operation))
    }

    #[must_use]
    pub fn backoff(&self) -> &JitteredBackoff {
        &self.backoff
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep unless the host cancels first
    ///
    /// # Errors
    /// Returns [`ProviderError::Cancelled`] if the token fires during the sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ProviderError> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
