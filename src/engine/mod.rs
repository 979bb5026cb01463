//! # Reconciliation Engine
//!
//! Primitives shared by every lifecycle shell: retries with a classified error
//! policy, pagination over a bounded worker pool, status waiters, composite
//! identifiers and set differences.

pub mod backoff;
pub mod classify;
pub mod context;
pub mod digest;
pub mod error;
pub mod id;
pub mod paginate;
pub mod pool;
pub mod retry;
pub mod setdiff;
pub mod waiter;

pub use classify::{Classification, ErrorPolicy};
pub use context::{Deadline, Operation, OperationContext, Timeouts};
pub use error::{ErrorCode, ProviderError, ProviderResult, VendorError};
pub use paginate::{ListOutcome, Page, PageRequest, Paginator};
pub use retry::{retry, retry_call, RetryError};
pub use waiter::{Observed, StatusWaiter, WaitOutcome};
