//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, status
//! - `gateway_rejections_total` (counter): chain rejections by service, kind
//! - `gateway_forward_duration_seconds` (histogram): forward latency by service, instance
//! - `gateway_breaker_transitions_total` (counter): breaker transitions by service, target mode
//!
//! # Design Decisions
//! - `metrics` facade; recording is a no-op until an exporter is installed
//! - Prometheus exporter only when enabled in config

use std::net::SocketAddr;
use std::time::Duration;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service: &str, status: u16) {
    counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_rejection(service: &str, kind: &'static str) {
    counter!(
        "gateway_rejections_total",
        "service" => service.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_forward(service: &str, instance: &str, latency: Duration) {
    histogram!(
        "gateway_forward_duration_seconds",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .record(latency.as_secs_f64());
}

pub fn record_breaker_transition(service: &str, to: &'static str) {
    counter!(
        "gateway_breaker_transitions_total",
        "service" => service.to_string(),
        "to" => to
    )
    .increment(1);
}
