//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by method, status, prefix
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_authz_decisions_total` (counter): RBAC decisions by outcome
//! - `gateway_upstream_failures_total` (counter): failed forwards by prefix and reason
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade, so it is a no-op until
//!   [`init_metrics`] installs the Prometheus recorder
//! - Prefix labels only carry registered prefixes, never raw request paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, prefix: &str, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "prefix" => prefix.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_authz_decision(allowed: bool) {
    let decision = if allowed { "allow" } else { "deny" };
    ::metrics::counter!("gateway_authz_decisions_total", "decision" => decision).increment(1);
}

pub fn record_upstream_failure(prefix: &str, reason: &'static str) {
    ::metrics::counter!(
        "gateway_upstream_failures_total",
        "prefix" => prefix.to_string(),
        "reason" => reason
    )
    .increment(1);
}
