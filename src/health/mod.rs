//! Health reporting.
//!
//! # Data Flow
//! ```text
//! GET /
//!     → report.rs (configuration checks from BotConfig)
//!     → healthy | degraded JSON
//! ```
//!
//! Checks are computed once at startup; config is immutable afterwards.

pub mod report;

pub use report::{HealthChecks, HealthReport, HealthStatus};
