//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define capture metrics (callbacks, writes, subscription requests)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `capture_callbacks_total` (counter): callbacks by outcome
//! - `capture_writes_total` (counter): file writes by category, result
//! - `capture_write_duration_seconds` (histogram): time spent per write
//! - `capture_subscription_requests_total` (counter): feed API calls by operation, result
//! - `capture_subscription_active` (gauge): 1 while a subscription is registered
//!
//! Recording without an installed exporter is a no-op, so tests never need one.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one inbound callback.
pub fn record_callback(outcome: &'static str) {
    counter!("capture_callbacks_total", "outcome" => outcome).increment(1);
}

/// Record one output file write.
pub fn record_write(category: &str, success: bool, start: Instant) {
    let result = if success { "ok" } else { "error" };
    counter!(
        "capture_writes_total",
        "category" => category.to_string(),
        "result" => result
    )
    .increment(1);
    histogram!("capture_write_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record one request against the feed API.
pub fn record_subscription_request(operation: &'static str, success: bool) {
    let result = if success { "ok" } else { "error" };
    counter!(
        "capture_subscription_requests_total",
        "operation" => operation,
        "result" => result
    )
    .increment(1);
}

/// Mark whether a subscription is currently registered.
pub fn record_subscription_active(active: bool) {
    gauge!("capture_subscription_active").set(if active { 1.0 } else { 0.0 });
}
