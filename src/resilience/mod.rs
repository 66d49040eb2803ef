//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (verifier, Discord, Google):
//!     → timeouts.rs (every call has a deadline)
//!     → On failure: retries.rs (429 → server delay, 5xx → backoff, 4xx → fail)
//!     → backoff.rs (jittered exponential delay)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Backoff is jittered
//! - Retry counts are bounded per call

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use timeouts::{with_timeout, TimeoutError, DEFAULT_TIMEOUT};
