//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bulwark_breaker_transitions_total` (counter): state changes by breaker, target state
//! - `bulwark_breaker_rejections_total` (counter): calls rejected while open
//! - `bulwark_rate_limited_total` (counter): denied requests by backend
//! - `bulwark_rate_limit_fail_open_total` (counter): requests allowed because the store failed
//! - `bulwark_cache_entries` (gauge): physical entries after the last sweep
//! - `bulwark_cache_evictions_total` (counter): entries removed by the sweeper
//! - `bulwark_retry_attempts_total` (counter): retry outcomes
//! - `bulwark_jobs_total` (counter): jobs by outcome (queued, dropped, processed, skipped)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Prometheus exporter is opt-in via config

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_breaker_transition(breaker: &str, to: &'static str) {
    counter!("bulwark_breaker_transitions_total", "breaker" => breaker.to_string(), "to" => to).increment(1);
}

pub fn record_breaker_rejection(breaker: &str) {
    counter!("bulwark_breaker_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_rate_limited(backend: &'static str) {
    counter!("bulwark_rate_limited_total", "backend" => backend).increment(1);
}

pub fn record_rate_limit_fail_open() {
    counter!("bulwark_rate_limit_fail_open_total").increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("bulwark_cache_entries").set(entries as f64);
}

pub fn record_cache_evictions(removed: usize) {
    counter!("bulwark_cache_evictions_total").increment(removed as u64);
}

pub fn record_retry(outcome: &'static str) {
    counter!("bulwark_retry_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_job(outcome: &'static str) {
    counter!("bulwark_jobs_total", "outcome" => outcome).increment(1);
}
