// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the add-on CSR signer.
//!
//! All metrics use the namespace prefix `addon_csr_signer_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Outcomes and duration of reconciliation attempts
//! - **Skip Metrics** - Why CSRs were left untouched
//! - **Signing Metrics** - Certificates issued per add-on
//! - **Error Metrics** - Failed attempts by error category
//!
//! # Example
//!
//! ```rust,no_run
//! use addon_csr_signer::metrics::{gather_metrics, record_certificate_signed};
//!
//! record_certificate_signed("foo", std::time::Duration::from_millis(12));
//! let text = gather_metrics().unwrap();
//! assert!(text.contains("addon_csr_signer_certificates_signed_total"));
//! ```

use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "addon_csr_signer";

/// `outcome` label value for an attempt that issued a certificate
pub const OUTCOME_SIGNED: &str = "signed";

/// `outcome` label value for an attempt that left the CSR untouched
pub const OUTCOME_SKIPPED: &str = "skipped";

/// `outcome` label value for a failed attempt
pub const OUTCOME_ERROR: &str = "error";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliation attempts by outcome
///
/// Labels:
/// - `outcome`: `signed`, `skipped` or `error`
pub static RECONCILIATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of CSR reconciliation attempts by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation attempts in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of CSR reconciliation attempts in seconds",
    )
    .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Skip Metrics
// ============================================================================

/// Total number of skipped CSRs by reason
///
/// Labels:
/// - `reason`: skip reason identifier (e.g., `NotApproved`, `AlreadySigned`)
pub static SKIPS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_skips_total"),
        "Total number of CSRs left untouched by skip reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Signing Metrics
// ============================================================================

/// Total number of certificates issued by add-on
///
/// Labels:
/// - `addon`: add-on name
pub static CERTIFICATES_SIGNED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_certificates_signed_total"),
        "Total number of certificates issued by add-on",
    );
    let counter = CounterVec::new(opts, &["addon"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of failed reconciliation attempts by error category
///
/// Labels:
/// - `error_type`: `cache_error`, `sign_error`, `conflict` or `status_write_error`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of failed reconciliation attempts by error category",
    );
    let counter = CounterVec::new(opts, &["error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

fn observe_duration(outcome: &str, duration: Duration) {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
    RECONCILIATION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record an attempt that issued a certificate
///
/// # Arguments
/// * `addon` - The add-on the certificate was issued for
/// * `duration` - Duration of the attempt
pub fn record_certificate_signed(addon: &str, duration: Duration) {
    observe_duration(OUTCOME_SIGNED, duration);
    CERTIFICATES_SIGNED_TOTAL.with_label_values(&[addon]).inc();
}

/// Record an attempt that left the CSR untouched
///
/// # Arguments
/// * `reason` - Skip reason identifier
/// * `duration` - Duration of the attempt
pub fn record_skip(reason: &str, duration: Duration) {
    observe_duration(OUTCOME_SKIPPED, duration);
    SKIPS_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a failed attempt
///
/// # Arguments
/// * `error_type` - Category of error (e.g., `cache_error`, `conflict`)
/// * `duration` - Duration of the attempt before failure
pub fn record_error(error_type: &str, duration: Duration) {
    observe_duration(OUTCOME_ERROR, duration);
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
