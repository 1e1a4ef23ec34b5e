//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `alibaba_provider_reconciliations_total` - Reconciliation passes by kind
//! - `alibaba_provider_reconciliation_errors_total` - Failed passes by kind and error class
//! - `alibaba_provider_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `alibaba_provider_external_operations_total` - Provider API calls by kind and verb
//! - `alibaba_provider_external_operation_errors_total` - Failed provider API calls by kind and verb
//! - `alibaba_provider_external_operation_duration_seconds` - Duration of provider API calls
//! - `alibaba_provider_requeues_total` - Requeues by reason

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "alibaba_provider_reconciliations_total",
            "Total number of reconciliation passes",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "alibaba_provider_reconciliation_errors_total",
            "Total number of failed reconciliation passes by error class",
        ),
        &["kind", "class"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "alibaba_provider_reconciliation_duration_seconds",
            "Duration of reconciliation passes in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static EXTERNAL_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "alibaba_provider_external_operations_total",
            "Total number of provider API operations",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create EXTERNAL_OPERATIONS_TOTAL metric - this should never happen")
});

static EXTERNAL_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "alibaba_provider_external_operation_errors_total",
            "Total number of failed provider API operations",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create EXTERNAL_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static EXTERNAL_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "alibaba_provider_external_operation_duration_seconds",
            "Duration of provider API operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 30.0]),
        &["kind", "operation"],
    )
    .expect("Failed to create EXTERNAL_OPERATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "alibaba_provider_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry served on `/metrics`
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(EXTERNAL_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EXTERNAL_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EXTERNAL_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str, class: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, class])
        .inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_external_operations(kind: &str, operation: &str) {
    EXTERNAL_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_external_operation_errors(kind: &str, operation: &str) {
    EXTERNAL_OPERATION_ERRORS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn observe_external_operation_duration(kind: &str, operation: &str, duration: f64) {
    EXTERNAL_OPERATION_DURATION
        .with_label_values(&[kind, operation])
        .observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_operation_counter_is_labelled() {
        let before = EXTERNAL_OPERATIONS_TOTAL
            .with_label_values(&["OSS", "observe"])
            .get();
        increment_external_operations("OSS", "observe");
        assert_eq!(
            EXTERNAL_OPERATIONS_TOTAL
                .with_label_values(&["OSS", "observe"])
                .get(),
            before + 1
        );
    }
}
