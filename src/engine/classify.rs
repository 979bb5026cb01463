//! # Error Classifier
//!
//! Decides whether a failed attempt should be retried, surfaced, or treated
//! as success.
//!
//! The order of checks is fixed:
//! 1. transport and timeout failures are always retryable
//! 2. codes in the caller allowlist or the default set are retryable
//! 3. codes in the caller ignore set count as success
//! 4. everything else is surfaced

use super::error::{ErrorCode, ProviderError};
use std::collections::BTreeSet;

/// Codes retried by every operation
pub const DEFAULT_RETRYABLE_CODES: [ErrorCode; 3] = [
    ErrorCode::InternalServerError,
    ErrorCode::ReadTimedOut,
    ErrorCode::NetworkError,
];

/// Outcome of classifying a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    NonRetryable,
    IgnoreAsSuccess,
}

/// Caller-supplied retry and ignore sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    retryable: BTreeSet<ErrorCode>,
    ignored: BTreeSet<ErrorCode>,
}

impl ErrorPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy used by deletes: an absent resource is already deleted
    #[must_use]
    pub fn for_delete() -> Self {
        Self::new().ignore(ErrorCode::ResourceNotFound)
    }

    /// Add a code to the retry allowlist
    #[must_use]
    pub fn retry_on(mut self, code: impl Into<ErrorCode>) -> Self {
        self.retryable.insert(code.into());
        self
    }

    /// Add a code whose failures count as success
    #[must_use]
    pub fn ignore(mut self, code: impl Into<ErrorCode>) -> Self {
        self.ignored.insert(code.into());
        self
    }

    #[must_use]
    pub fn classify(&self, err: &ProviderError) -> Classification {
        classify(err, self)
    }
}

/// Classify a failure against a policy
#[must_use]
pub fn classify(err: &ProviderError, policy: &ErrorPolicy) -> Classification {
    match err.root() {
        ProviderError::Vendor(vendor) => {
            let code = &vendor.code;
            if DEFAULT_RETRYABLE_CODES.contains(code) || policy.retryable.contains(code) {
                Classification::Retryable
            } else if policy.ignored.contains(code) {
                Classification::IgnoreAsSuccess
            } else {
                Classification::NonRetryable
            }
        }
        ProviderError::StillOperating { .. } | ProviderError::Pending(_) => {
            Classification::Retryable
        }
        _ => Classification::NonRetryable,
    }
}
