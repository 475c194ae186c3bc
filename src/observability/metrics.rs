//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lps_http_requests_total` (counter): requests by route, status
//! - `lps_http_request_duration_seconds` (histogram): latency by route
//! - `lps_chain_reads_total` (counter): chain reads by operation, outcome
//! - `lps_chain_read_attempts` (histogram): attempts used per read
//! - `lps_quotes_created_total` (counter): stored quotes by provider
//! - `lps_quotes_accepted_total` (counter): successful acceptances
//! - `lps_quote_store_size` (gauge): quotes held in the store
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels stay low-cardinality: no hashes or addresses

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished HTTP request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    let route = route.to_string();
    counter!(
        "lps_http_requests_total",
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("lps_http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one retried chain read.
pub fn record_chain_read(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "exhausted" };
    counter!(
        "lps_chain_reads_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record how many attempts a read consumed, whatever its outcome.
pub fn record_read_attempts(operation: &'static str, attempts: u32) {
    histogram!("lps_chain_read_attempts", "operation" => operation).record(f64::from(attempts));
}

pub fn record_quote_created(provider: &str) {
    counter!("lps_quotes_created_total", "provider" => provider.to_string()).increment(1);
}

pub fn record_quote_accepted() {
    counter!("lps_quotes_accepted_total").increment(1);
}

pub fn record_store_size(size: usize) {
    gauge!("lps_quote_store_size").set(size as f64);
}
