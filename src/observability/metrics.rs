//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_active` (gauge): sessions currently in the registry
//! - `relay_sessions_total` (counter): sessions accepted
//! - `relay_messages_total` (counter): requests parsed and dispatched
//! - `relay_bytes_received_total` / `relay_bytes_sent_total` (counters)
//! - `relay_accept_errors_total` (counter): failed accepts
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed
//! - The Prometheus exporter is optional and owns its own HTTP listener

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and start its scrape endpoint.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened(active: usize) {
    ::metrics::counter!("relay_sessions_total").increment(1);
    ::metrics::gauge!("relay_sessions_active").set(active as f64);
}

pub fn record_active_sessions(active: usize) {
    ::metrics::gauge!("relay_sessions_active").set(active as f64);
}

/// Record one dispatched request of `bytes` bytes.
pub fn record_message(bytes: usize) {
    ::metrics::counter!("relay_messages_total").increment(1);
    ::metrics::counter!("relay_bytes_received_total").increment(bytes as u64);
}

pub fn record_bytes_sent(bytes: usize) {
    ::metrics::counter!("relay_bytes_sent_total").increment(bytes as u64);
}

pub fn record_accept_error() {
    ::metrics::counter!("relay_accept_errors_total").increment(1);
}
