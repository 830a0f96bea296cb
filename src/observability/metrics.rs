//! Metrics collection and exposition.
//!
//! # Metrics
//! - `decorator_requests_total` (counter): responses by outcome (`decorated`,
//!   or the passthrough reason)
//! - `decorator_fallbacks_total` (counter): failed decorations by error kind
//! - `decorator_render_duration_seconds` (histogram): template render latency
//!
//! # Design Decisions
//! - Prometheus exporter is optional; without it the macros are no-ops
//! - Labels are low-cardinality (decorator ids come from config)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decorated(decorator: &str) {
    counter!("decorator_requests_total", "outcome" => "decorated", "decorator" => decorator.to_string())
        .increment(1);
}

pub fn record_passthrough(reason: &'static str) {
    counter!("decorator_requests_total", "outcome" => reason).increment(1);
}

pub fn record_fallback(reason: &'static str) {
    counter!("decorator_fallbacks_total", "reason" => reason).increment(1);
}

pub fn record_render(decorator: &str, started: Instant) {
    histogram!("decorator_render_duration_seconds", "decorator" => decorator.to_string())
        .record(started.elapsed().as_secs_f64());
}
