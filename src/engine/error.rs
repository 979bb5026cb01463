//! # Errors
//!
//! Error taxonomy shared by the engine, the vendor client and the lifecycle shells.
//!
//! Vendor error codes stay strings on the wire, but they are wrapped in
//! [`ErrorCode`] as soon as they leave the REST client so nothing above the
//! classifier ever pattern-matches a raw code string.

use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Vendor error code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCode {
    /// Transport failure before a response was received
    NetworkError,
    /// 5xx-class failure reported by the remote
    InternalServerError,
    /// Client-side read timeout
    ReadTimedOut,
    /// The addressed resource does not exist
    ResourceNotFound,
    /// Any other code, preserved verbatim
    Other(String),
}

impl ErrorCode {
    /// Wire representation of the code
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::ReadTimedOut => "READ_TIMED_OUT",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::Other(code) => code,
        }
    }

    /// Parse a wire code, mapping the well-known ones to their variants
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "NETWORK_ERROR" => Self::NetworkError,
            "INTERNAL_SERVER_ERROR" => Self::InternalServerError,
            "READ_TIMED_OUT" => Self::ReadTimedOut,
            "RESOURCE_NOT_FOUND" => Self::ResourceNotFound,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error returned by the vendor API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorError {
    pub code: ErrorCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl VendorError {
    #[must_use]
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl fmt::Display for VendorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request id: {request_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for VendorError {}

/// Errors surfaced by provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Error returned by the vendor API
    #[error("vendor error {0}")]
    Vendor(VendorError),

    /// The retry deadline passed; carries the last observed error
    #[error("timeout exhausted after {attempts} attempt(s): {last}")]
    TimeoutExhausted {
        attempts: u32,
        last: Box<ProviderError>,
    },

    /// The host aborted the operation
    #[error("operation cancelled")]
    Cancelled,

    /// A composite identifier did not have the expected number of parts
    #[error("malformed id `{id}`: expected {expected} part(s) separated by `:`, found {found}")]
    MalformedId {
        id: String,
        expected: usize,
        found: usize,
    },

    /// The resource is still transitioning
    #[error("resource is still in status `{status}`")]
    StillOperating { status: String },

    /// The resource entered a terminal failure status
    #[error("resource entered terminal status `{status}`")]
    TerminalStatus { status: String },

    /// The resource reported a status outside every known set
    #[error("unexpected resource status `{status}`")]
    UnexpectedStatus { status: String },

    /// A precondition that is expected to be met eventually
    #[error("{0}")]
    Pending(String),

    /// A permanent failure with a caller-chosen message
    #[error("{0}")]
    Permanent(String),

    /// Local state cannot be used for the requested operation
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Error wrapped with lifecycle context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<ProviderError>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<VendorError> for ProviderError {
    fn from(err: VendorError) -> Self {
        Self::Vendor(err)
    }
}

impl ProviderError {
    /// Build a vendor error from a code and message
    #[must_use]
    pub fn vendor(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self::Vendor(VendorError::new(code, message))
    }

    /// Wrap this error with lifecycle context
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable code for diagnostics; vendor codes pass through verbatim
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Vendor(err) => err.code.as_str(),
            Self::TimeoutExhausted { .. } => "TIMEOUT_EXHAUSTED",
            Self::Cancelled => "CANCELLED",
            Self::MalformedId { .. } => "MALFORMED_ID",
            Self::StillOperating { .. } => "STILL_OPERATING",
            Self::TerminalStatus { .. } => "TERMINAL_STATUS",
            Self::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
            Self::Pending(_) => "PRECONDITION_PENDING",
            Self::Permanent(_) => "PERMANENT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Context { source, .. } => source.code(),
            Self::Serialization(_) => "SERIALIZATION",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Vendor code of this error, looking through context layers
    #[must_use]
    pub fn vendor_code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Vendor(err) => Some(&err.code),
            Self::Context { source, .. } => source.vendor_code(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.vendor_code() == Some(&ErrorCode::ResourceNotFound)
    }

    /// Error without its context layers
    #[must_use]
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Last status seen by a waiter that ran out of time
    #[must_use]
    pub fn last_status(&self) -> Option<&str> {
        match self.root() {
            Self::TimeoutExhausted { last, .. } => match last.root() {
                Self::StillOperating { status }
                | Self::TerminalStatus { status }
                | Self::UnexpectedStatus { status } => Some(status),
                _ => None,
            },
            _ => None,
        }
    }
}
