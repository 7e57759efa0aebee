//! Prometheus metrics for cart-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Recorder behind the `metrics` macros used by the HTTP middleware.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Cart operations by operation name and outcome.
pub static CART_OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cart_operations_total",
        "Total number of cart operations by outcome",
        &["operation", "outcome"]
    )
    .expect("Failed to register cart_operations_total")
});

/// Repository call duration histogram.
pub static STORE_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "cart_store_query_duration_seconds",
        "Invoice repository call duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register store_query_duration")
});

/// Invoices removed because their cart emptied, or on request.
pub static INVOICES_DELETED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cart_invoices_deleted_total",
        "Total number of deleted invoices by reason",
        &["reason"]
    )
    .expect("Failed to register invoices_deleted_total")
});

/// Quantity changes refused by the stock policy.
pub static POLICY_REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "cart_policy_rejections_total",
        "Total number of quantity changes refused by the stock policy",
        &["policy"]
    )
    .expect("Failed to register policy_rejections_total")
});

/// Initialize all metrics (forces lazy initialization) and install the
/// recorder for the HTTP middleware. Safe to call more than once.
pub fn init_metrics() {
    Lazy::force(&CART_OPERATIONS_TOTAL);
    Lazy::force(&STORE_QUERY_DURATION);
    Lazy::force(&INVOICES_DELETED_TOTAL);
    Lazy::force(&POLICY_REJECTIONS_TOTAL);

    if METRICS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
    }
}

/// Record the outcome of a cart operation.
pub fn record_operation(operation: &str, outcome: &str) {
    CART_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    if let Ok(custom) = encoder.encode_to_string(&metric_families) {
        output.push_str(&custom);
    }
    output
}
