//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bot_requests_total` (counter): requests by method, status
//! - `bot_request_duration_seconds` (histogram): end-to-end latency
//! - `bot_security_rejections_total` (counter): rejections by reason
//! - `bot_rate_limited_total` (counter): requests denied by the rate limiter
//! - `bot_commands_total` (counter): commands by name, outcome
//! - `bot_sync_tasks_total` (counter): background syncs by outcome
//! - `bot_rate_limit_entries` (gauge): clients tracked by the limiter
//!
//! Without an installed recorder every call is a no-op, so tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

const REQUESTS_TOTAL: &str = "bot_requests_total";
const REQUEST_DURATION: &str = "bot_request_duration_seconds";
const SECURITY_REJECTIONS: &str = "bot_security_rejections_total";
const RATE_LIMITED: &str = "bot_rate_limited_total";
const COMMANDS_TOTAL: &str = "bot_commands_total";
const SYNC_TASKS_TOTAL: &str = "bot_sync_tasks_total";
const RATE_LIMIT_ENTRIES: &str = "bot_rate_limit_entries";

/// Latency buckets for a 3 second interaction deadline.
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0];

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(REQUEST_DURATION.to_string()),
            LATENCY_BUCKETS,
        )?
        .install()?;

    tracing::info!(metrics_addr = %addr, "Prometheus metrics exporter started");
    Ok(())
}

#[inline]
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(REQUESTS_TOTAL, "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(REQUEST_DURATION, "method" => method.to_string()).record(start.elapsed().as_secs_f64());
}

#[inline]
pub fn record_security_rejection(reason: &'static str) {
    counter!(SECURITY_REJECTIONS, "reason" => reason).increment(1);
}

#[inline]
pub fn record_rate_limited() {
    counter!(RATE_LIMITED).increment(1);
}

#[inline]
pub fn record_rate_limit_entries(count: usize) {
    gauge!(RATE_LIMIT_ENTRIES).set(count as f64);
}

/// `outcome` is one of `ok`, `error`, `unknown`.
#[inline]
pub fn record_command(command: &str, outcome: &'static str) {
    counter!(COMMANDS_TOTAL, "command" => command.to_string(), "outcome" => outcome).increment(1);
}

/// `outcome` is `accepted`, `succeeded`, or `failed`.
#[inline]
pub fn record_sync(outcome: &'static str) {
    counter!(SYNC_TASKS_TOTAL, "outcome" => outcome).increment(1);
}
