//! Metrics collection and exposition.
//!
//! # Metrics
//! - `access_proxy_requests_total` (counter): requests by method, status
//! - `access_proxy_request_duration_seconds` (histogram): latency distribution
//! - `access_proxy_rejections_total` (counter): denials by gate
//! - `access_proxy_upstream_errors_total` (counter): forwarding failures
//! - `access_proxy_rate_limit_identifiers` (gauge): tracked rate-limit keys
//!
//! Recording is a no-op until a recorder is installed, so gates record
//! unconditionally.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "access_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("access_proxy_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// `gate` is one of `method_block`, `client_domain`, `rate_limit`.
pub fn record_rejection(gate: &'static str) {
    metrics::counter!("access_proxy_rejections_total", "gate" => gate).increment(1);
}

pub fn record_upstream_error() {
    metrics::counter!("access_proxy_upstream_errors_total").increment(1);
}

pub fn record_tracked_identifiers(count: usize) {
    metrics::gauge!("access_proxy_rate_limit_identifiers").set(count as f64);
}
