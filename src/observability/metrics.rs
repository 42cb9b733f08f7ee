//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define pipeline metrics (requests, audit delivery, recovered panics)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `requests_total` (counter): completed requests by method, status code
//! - `request_duration_seconds` (histogram): latency distribution
//! - `audit_events_total` (counter): audit records handed to the sink, by result
//! - `audit_send_failures_total` (counter): failed or rejected audit sends
//! - `audit_excluded_total` (counter): requests skipped by exclusion rules
//! - `panics_recovered_total` (counter): panics caught by the recovery boundary
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels stay low-cardinality (method, code, result)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new();
    match builder.with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("code", status.to_string()),
    ];
    counter!("requests_total", &labels).increment(1);
    histogram!("request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_audit_event(result: &'static str) {
    counter!("audit_events_total", "result" => result).increment(1);
}

pub fn record_audit_failure() {
    counter!("audit_send_failures_total").increment(1);
}

pub fn record_audit_excluded() {
    counter!("audit_excluded_total").increment(1);
}

pub fn record_panic_recovered() {
    counter!("panics_recovered_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, Instant::now());
        record_audit_event("Success");
        record_audit_failure();
        record_audit_excluded();
        record_panic_recovered();
    }
}
