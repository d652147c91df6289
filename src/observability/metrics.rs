//! Metrics collection and exposition.
//!
//! # Metrics
//! - `valorix_rate_limited_total` (counter): requests rejected by the rate limiter
//! - `valorix_server_faults_total` (counter): faults translated into 500 responses, by kind
//!
//! The Prometheus exporter is only installed when `METRICS_ENABLED` is set;
//! without it the counters are no-ops.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(address).install()?;
    tracing::info!(address = %address, "Metrics endpoint started");
    Ok(())
}

pub fn record_rate_limited() {
    metrics::counter!("valorix_rate_limited_total").increment(1);
}

/// `kind` is `error` for handler faults and `panic` for caught panics.
pub fn record_server_fault(kind: &'static str) {
    metrics::counter!("valorix_server_faults_total", "kind" => kind).increment(1);
}
