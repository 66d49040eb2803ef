//! Timeout enforcement.
//!
//! Every awaited external call (signature verification, Discord and Google
//! HTTP calls) goes through [`with_timeout`] so one stalled dependency cannot
//! consume the whole request or background budget.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Deadline used when a caller has no specific budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Uniform timeout error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation timed out after {millis}ms")]
pub struct TimeoutError {
    pub millis: u128,
}

/// Race `future` against a timer.
pub async fn with_timeout<F, T>(future: F, limit: Duration) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| TimeoutError {
            millis: limit.as_millis(),
        })
}
