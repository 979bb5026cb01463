//! # Constants
//!
//! Shared constants used throughout the provider.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default vendor API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://console.zenlayer.com";

/// Vendor API version sent with every request
pub const API_VERSION: &str = "2022-11-20";

/// Default request-client string identifying this plugin to the vendor
pub const DEFAULT_REQUEST_CLIENT: &str = "zenlayercloud-provider";

/// Default HTTP request timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default mean interval between retry attempts and waiter polls (milliseconds)
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 3000;

/// Default random spread applied to the retry interval (fraction of the interval)
pub const DEFAULT_RETRY_JITTER: f64 = 0.2;

/// Page size used by list operations
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Maximum number of page fetches in flight during pagination fan-out
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;

/// Pages a single listing may fan out to after page 1
pub const MAX_LIST_PAGES: u32 = 10_000;

/// Subtracted from host timeouts for reads, updates and deletes (seconds)
pub const TIMEOUT_SAFETY_MARGIN_SECS: u64 = 60;

/// Default Create timeout (seconds)
pub const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 600;

/// Default Read timeout (seconds)
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Default Update timeout (seconds)
pub const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 600;

/// Default Delete timeout (seconds)
pub const DEFAULT_DELETE_TIMEOUT_SECS: u64 = 600;

/// Delimiter between the parts of a composite identifier
pub const ID_DELIMITER: char = ':';

/// Build time stamped by `build.rs`
pub const BUILD_DATETIME: &str = env!("BUILD_DATETIME");

/// Short git hash stamped by `build.rs`
pub const BUILD_GIT_HASH: &str = env!("BUILD_GIT_HASH");
