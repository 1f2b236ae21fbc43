//! Prometheus metrics for store latency and request outcomes.
//!
//! This module provides metrics for:
//! - Store operation latency, labelled by operation
//! - Items created
//! - Validation and dependency failures surfaced by the API
//! - Tables created by the guard

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Store operation latency metric name.
pub const METRIC_STORE_LATENCY: &str = "store_operation_latency_ms";
/// Store errors counter metric name.
pub const METRIC_STORE_ERRORS: &str = "store_errors_total";
/// Items created counter metric name.
pub const METRIC_ITEMS_CREATED: &str = "items_created_total";
/// Items returned by list counter metric name.
pub const METRIC_ITEMS_LISTED: &str = "items_listed_total";
/// Validation failures counter metric name.
pub const METRIC_VALIDATION_FAILURES: &str = "validation_failures_total";
/// Dependency failures counter metric name.
pub const METRIC_DEPENDENCY_FAILURES: &str = "dependency_failures_total";
/// Tables created counter metric name.
pub const METRIC_TABLES_CREATED: &str = "tables_created_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_STORE_LATENCY,
        "Key-value store operation latency in milliseconds"
    );

    describe_counter!(METRIC_STORE_ERRORS, "Total number of failed store operations");
    describe_counter!(METRIC_ITEMS_CREATED, "Total number of items written");
    describe_counter!(METRIC_ITEMS_LISTED, "Total number of items returned by list");
    describe_counter!(
        METRIC_VALIDATION_FAILURES,
        "Total number of requests rejected with 400"
    );
    describe_counter!(
        METRIC_DEPENDENCY_FAILURES,
        "Total number of requests failed with 500"
    );
    describe_counter!(METRIC_TABLES_CREATED, "Total number of tables created");

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and describe all metrics.
pub fn install_prometheus() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record store operation latency.
pub fn record_store_latency(start: Instant, operation: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_STORE_LATENCY, "operation" => operation).record(latency_ms);
}

/// Increment store errors counter.
pub fn inc_store_errors(operation: &'static str) {
    counter!(METRIC_STORE_ERRORS, "operation" => operation).increment(1);
}

/// Increment items created counter.
pub fn inc_items_created() {
    counter!(METRIC_ITEMS_CREATED).increment(1);
}

/// Add to the items listed counter.
pub fn add_items_listed(count: usize) {
    counter!(METRIC_ITEMS_LISTED).increment(count as u64);
}

/// Increment validation failures counter.
pub fn inc_validation_failures() {
    counter!(METRIC_VALIDATION_FAILURES).increment(1);
}

/// Increment dependency failures counter.
pub fn inc_dependency_failures() {
    counter!(METRIC_DEPENDENCY_FAILURES).increment(1);
}

/// Increment tables created counter.
pub fn inc_tables_created() {
    counter!(METRIC_TABLES_CREATED).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    operation: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for a store operation.
    pub fn store(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_store_latency(self.start, self.operation);
    }
}
