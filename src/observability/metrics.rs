//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fetch_attempts_total` (counter): network attempts by outcome
//! - `fetch_attempt_duration_seconds` (histogram): per-attempt latency
//! - `fetch_retries_total` (counter): backoff sleeps taken
//! - `fetch_breaker_trips_total` (counter): closed → open transitions
//! - `fetch_breaker_rejections_total` (counter): fast-failed calls
//! - `fetch_cache_events_total` (counter): hit, store, miss_304
//! - `fetch_cache_entries` (gauge): cached URLs
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(outcome: &'static str, elapsed: Duration) {
    counter!("fetch_attempts_total", "outcome" => outcome).increment(1);
    histogram!("fetch_attempt_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_retry() {
    counter!("fetch_retries_total").increment(1);
}

pub fn record_breaker_trip() {
    counter!("fetch_breaker_trips_total").increment(1);
}

pub fn record_breaker_rejection() {
    counter!("fetch_breaker_rejections_total").increment(1);
}

pub fn record_cache_event(event: &'static str) {
    counter!("fetch_cache_events_total", "event" => event).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("fetch_cache_entries").set(entries as f64);
}
