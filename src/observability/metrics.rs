//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): `/proxy` calls by outcome, status
//! - `proxy_request_duration_seconds` (histogram): `/proxy` latency by outcome
//! - `proxy_mtls_enabled` (gauge): 1 when the mTLS context was built

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished `/proxy` call.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request refused before reaching the handler.
pub fn record_rejection(outcome: &'static str, status: u16) {
    counter!(
        "proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_mtls_state(enabled: bool) {
    gauge!("proxy_mtls_enabled").set(if enabled { 1.0 } else { 0.0 });
}
