//! # Metrics
//!
//! Prometheus metrics for monitoring the provider.
//!
//! ## Metrics Exposed
//!
//! - `zenlayercloud_provider_api_calls_total` - Vendor API calls by service and action
//! - `zenlayercloud_provider_api_errors_total` - Vendor API errors by error code
//! - `zenlayercloud_provider_api_call_duration_seconds` - Duration of vendor API calls by service
//! - `zenlayercloud_provider_retry_attempts_total` - Attempts beyond the first made by the retry executor
//! - `zenlayercloud_provider_waiter_polls_total` - Status polls made by waiters
//! - `zenlayercloud_provider_operations_total` - Lifecycle operations by resource type and operation
//! - `zenlayercloud_provider_operation_errors_total` - Failed lifecycle operations by resource type and operation

use anyhow::{Context, Result};
use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static API_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "zenlayercloud_provider_api_calls_total",
            "Total number of vendor API calls by service and action",
        ),
        &["service", "action"],
    )
    .expect("Failed to create API_CALLS_TOTAL metric - this should never happen")
});

static API_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "zenlayercloud_provider_api_errors_total",
            "Total number of vendor API errors by error code",
        ),
        &["code"],
    )
    .expect("Failed to create API_ERRORS_TOTAL metric - this should never happen")
});

static API_CALL_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "zenlayercloud_provider_api_call_duration_seconds",
            "Duration of vendor API calls in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service"],
    )
    .expect("Failed to create API_CALL_DURATION metric - this should never happen")
});

static RETRY_ATTEMPTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "zenlayercloud_provider_retry_attempts_total",
        "Total number of retried attempts (attempts beyond the first)",
    )
    .expect("Failed to create RETRY_ATTEMPTS_TOTAL metric - this should never happen")
});

static WAITER_POLLS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "zenlayercloud_provider_waiter_polls_total",
        "Total number of resource status polls",
    )
    .expect("Failed to create WAITER_POLLS_TOTAL metric - this should never happen")
});

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "zenlayercloud_provider_operations_total",
            "Total number of lifecycle operations by resource type and operation",
        ),
        &["resource", "operation"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "zenlayercloud_provider_operation_errors_total",
            "Total number of failed lifecycle operations by resource type and operation",
        ),
        &["resource", "operation"],
    )
    .expect("Failed to create OPERATION_ERRORS_TOTAL metric - this should never happen")
});

/// Register every metric with the provider registry
///
/// Calling this more than once is harmless.
///
/// # Errors
/// Returns an error if a metric cannot be registered for a reason other than
/// already being registered.
pub fn register_metrics() -> Result<()> {
    let collectors: [Box<dyn prometheus::core::Collector>; 7] = [
        Box::new(API_CALLS_TOTAL.clone()),
        Box::new(API_ERRORS_TOTAL.clone()),
        Box::new(API_CALL_DURATION.clone()),
        Box::new(RETRY_ATTEMPTS_TOTAL.clone()),
        Box::new(WAITER_POLLS_TOTAL.clone()),
        Box::new(OPERATIONS_TOTAL.clone()),
        Box::new(OPERATION_ERRORS_TOTAL.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e).context("Failed to register provider metric"),
        }
    }
    Ok(())
}

/// Render the registry in the Prometheus text exposition format
///
/// # Errors
/// Returns an error if encoding fails.
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

pub fn record_api_call(service: &str, action: &str, duration: f64) {
    API_CALLS_TOTAL.with_label_values(&[service, action]).inc();
    API_CALL_DURATION
        .with_label_values(&[service])
        .observe(duration);
}

pub fn increment_api_errors(code: &str) {
    API_ERRORS_TOTAL.with_label_values(&[code]).inc();
}

pub fn increment_retry_attempts() {
    RETRY_ATTEMPTS_TOTAL.inc();
}

pub fn increment_waiter_polls() {
    WAITER_POLLS_TOTAL.inc();
}

pub fn record_operation(resource: &str, operation: &str) {
    OPERATIONS_TOTAL
        .with_label_values(&[resource, operation])
        .inc();
}

pub fn increment_operation_errors(resource: &str, operation: &str) {
    OPERATION_ERRORS_TOTAL
        .with_label_values(&[resource, operation])
        .inc();
}
