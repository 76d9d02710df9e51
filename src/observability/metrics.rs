//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_aggregations_total` (counter): aggregations by status, timed_out
//! - `gateway_aggregation_duration_seconds` (histogram): wall-clock per aggregation
//! - `gateway_service_outcomes_total` (counter): outcomes by service, outcome
//! - `gateway_late_completions_total` (counter): fetches that finished after their deadline
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_aggregation(status: &'static str, timed_out: bool, elapsed: Duration) {
    counter!(
        "gateway_aggregations_total",
        "status" => status,
        "timed_out" => if timed_out { "true" } else { "false" }
    )
    .increment(1);
    histogram!("gateway_aggregation_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_service_outcome(service: &str, outcome: &'static str) {
    counter!(
        "gateway_service_outcomes_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_late_completion(service: &str) {
    counter!("gateway_late_completions_total", "service" => service.to_string()).increment(1);
}
