//! Metrics instrumentation for the explorer service
//!
//! Provides Prometheus-compatible metrics for:
//! - Upstream request outcomes per endpoint
//! - Feed page sizes and backend switches
//! - Open feed count

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Metric names as constants for consistency
pub mod names {
    pub const UPSTREAM_REQUESTS: &str = "upstream_requests_total";
    pub const FEED_LOAD_DURATION: &str = "feed_load_duration_seconds";
    pub const FEED_RECORDS_APPENDED: &str = "feed_records_appended_total";
    pub const FEED_BACKEND_SWITCHES: &str = "feed_backend_switches_total";
    pub const FEED_STALE_RESPONSES: &str = "feed_stale_responses_total";
    pub const FEED_DUPLICATES_DROPPED: &str = "feed_duplicates_dropped_total";
    pub const FEEDS_OPEN: &str = "feeds_open";
}

/// Record an upstream request
pub fn record_upstream_request(endpoint: &'static str, success: bool) {
    counter!(
        names::UPSTREAM_REQUESTS,
        "endpoint" => endpoint,
        "success" => if success { "true" } else { "false" }
    )
    .increment(1);
}

/// Record how long one "load more" round trip took
pub fn record_feed_load(backend: &'static str, duration: std::time::Duration) {
    histogram!(names::FEED_LOAD_DURATION, "backend" => backend).record(duration.as_secs_f64());
}

/// Record records appended to a feed from one page
pub fn record_records_appended(backend: &'static str, count: u64) {
    counter!(names::FEED_RECORDS_APPENDED, "backend" => backend).increment(count);
}

/// Record a switch from the indexed backend to node REST
pub fn record_backend_switch(reason: &'static str) {
    counter!(names::FEED_BACKEND_SWITCHES, "reason" => reason).increment(1);
}

/// Record a response discarded because the feed moved to another address
pub fn record_stale_response() {
    counter!(names::FEED_STALE_RESPONSES).increment(1);
}

/// Record records dropped because their version was already held
pub fn record_duplicates_dropped(count: u64) {
    counter!(names::FEED_DUPLICATES_DROPPED).increment(count);
}

/// Set the number of open feeds
pub fn set_open_feeds(count: usize) {
    gauge!(names::FEEDS_OPEN).set(count as f64);
}

/// Helper struct for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

/// Initialize the Prometheus metrics exporter
/// Returns a handle to the metrics endpoint
pub fn init_metrics() -> anyhow::Result<metrics_exporter_prometheus::PrometheusHandle> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    builder
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))
}
