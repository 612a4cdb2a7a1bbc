//! Prometheus metrics for scan cycles, fetches and alerts.
//!
//! Counters and histograms are recorded through the `metrics` facade; the
//! binary installs a Prometheus recorder and serves it on `/metrics`. Without
//! a recorder (unit tests) every call is a no-op.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Scan cycle duration metric name.
pub const METRIC_CYCLE_LATENCY: &str = "scan_cycle_latency_ms";
/// Per-source fetch duration metric name.
pub const METRIC_FETCH_LATENCY: &str = "fetch_latency_ms";
/// Completed scan cycles counter metric name.
pub const METRIC_SCAN_CYCLES: &str = "scan_cycles_total";
/// Skipped scan cycles counter metric name.
pub const METRIC_SCAN_CYCLES_SKIPPED: &str = "scan_cycles_skipped_total";
/// Fetch failures counter metric name.
pub const METRIC_FETCH_FAILURES: &str = "fetch_failures_total";
/// Rejected scraped records counter metric name.
pub const METRIC_QUOTES_REJECTED: &str = "quotes_rejected_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Alerts delivered counter metric name.
pub const METRIC_ALERTS_SENT: &str = "alerts_sent_total";
/// Alerts suppressed by dedupe counter metric name.
pub const METRIC_ALERTS_SUPPRESSED: &str = "alerts_suppressed_total";
/// Notifier failures counter metric name.
pub const METRIC_NOTIFY_FAILURES: &str = "notify_failures_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(METRIC_CYCLE_LATENCY, "Scan cycle duration in milliseconds");
    describe_histogram!(METRIC_FETCH_LATENCY, "Source fetch duration in milliseconds");

    describe_counter!(METRIC_SCAN_CYCLES, "Total number of completed scan cycles");
    describe_counter!(
        METRIC_SCAN_CYCLES_SKIPPED,
        "Scan cycles skipped because a source fetch failed"
    );
    describe_counter!(METRIC_FETCH_FAILURES, "Source fetch failures by source");
    describe_counter!(
        METRIC_QUOTES_REJECTED,
        "Scraped records rejected at validation by source"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Opportunities inside the alert threshold"
    );
    describe_counter!(METRIC_ALERTS_SENT, "Opportunities delivered to the notifier");
    describe_counter!(
        METRIC_ALERTS_SUPPRESSED,
        "Opportunities suppressed as repeat alerts"
    );
    describe_counter!(METRIC_NOTIFY_FAILURES, "Failed notifier deliveries");

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record fetch latency for a source.
pub fn record_fetch_latency(start: Instant, source: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FETCH_LATENCY, "source" => source.to_string()).record(latency_ms);
}

/// Increment completed cycles counter.
pub fn inc_scan_cycles() {
    counter!(METRIC_SCAN_CYCLES).increment(1);
}

/// Increment skipped cycles counter.
pub fn inc_scan_cycles_skipped() {
    counter!(METRIC_SCAN_CYCLES_SKIPPED).increment(1);
}

/// Increment fetch failures counter for a source.
pub fn inc_fetch_failures(source: &str) {
    counter!(METRIC_FETCH_FAILURES, "source" => source.to_string()).increment(1);
}

/// Increment rejected records counter for a source.
pub fn inc_quotes_rejected(source: &str) {
    counter!(METRIC_QUOTES_REJECTED, "source" => source.to_string()).increment(1);
}

/// Increment opportunities detected counter.
pub fn inc_opportunities_detected() {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(1);
}

/// Add delivered alerts.
pub fn add_alerts_sent(count: u64) {
    counter!(METRIC_ALERTS_SENT).increment(count);
}

/// Increment suppressed alerts counter.
pub fn inc_alerts_suppressed() {
    counter!(METRIC_ALERTS_SUPPRESSED).increment(1);
}

/// Increment notifier failures counter.
pub fn inc_notify_failures() {
    counter!(METRIC_NOTIFY_FAILURES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for a whole scan cycle.
pub fn timer_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_CYCLE_LATENCY)
}
