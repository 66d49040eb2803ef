//! Retry classification for outbound REST calls.
//!
//! - 429 is retried after the server-provided delay
//! - 5xx and connection errors are retried with jittered backoff
//! - other 4xx are final

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

/// What to do with a failed upstream attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// Wait exactly this long (server-provided), then retry.
    After(Duration),
    /// Retry using exponential backoff.
    Backoff,
    /// Give up.
    Fail,
}

/// Body of a Discord 429 response.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitBody {
    /// Seconds to wait (fractional).
    pub retry_after: f64,
    /// Whether the whole bot is limited rather than one route.
    #[serde(default)]
    pub global: bool,
}

/// Classify a response status. `retry_after` is only consulted for 429, and
/// the server-provided wait never exceeds `max_wait`.
pub fn classify(
    status: Option<StatusCode>,
    retry_after: Option<&RateLimitBody>,
    max_wait: Duration,
) -> RetryDecision {
    match status {
        None => RetryDecision::Backoff,
        Some(StatusCode::TOO_MANY_REQUESTS) => match retry_after {
            Some(body) if body.retry_after.is_nan() || body.retry_after < 0.0 => RetryDecision::Backoff,
            Some(body) => RetryDecision::After(
                Duration::try_from_secs_f64(body.retry_after)
                    .map_or(max_wait, |wait| wait.min(max_wait)),
            ),
            None => RetryDecision::Backoff,
        },
        Some(s) if s.is_server_error() => RetryDecision::Backoff,
        Some(_) => RetryDecision::Fail,
    }
}
