//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tracing_segments_opened_total` (counter): segments created, by name
//! - `tracing_segments_emitted_total` (counter): segments handed off, by emitter
//! - `tracing_segment_emit_failures_total` (counter): serialization/send failures
//!
//! # Design Decisions
//! - Counters only; segment timing already lives in the segments themselves
//! - The Prometheus endpoint is opt-in and installed by the host process

use std::net::SocketAddr;

use ::metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

pub fn record_segment_opened(name: &str) {
    counter!("tracing_segments_opened_total", "name" => name.to_string()).increment(1);
}

pub fn record_segment_emitted(emitter: &'static str) {
    counter!("tracing_segments_emitted_total", "emitter" => emitter).increment(1);
}

pub fn record_emit_failure(emitter: &'static str) {
    counter!("tracing_segment_emit_failures_total", "emitter" => emitter).increment(1);
}

/// Install the Prometheus exporter on the given address. Failure to install
/// is logged; the process keeps running without exposition.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "Failed to install metrics exporter"),
    }
}
