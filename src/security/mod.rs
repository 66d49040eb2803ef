//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → context.rs (client IP, user agent, request id)
//!     → verification.rs
//!         → headers.rs (signature/timestamp headers, content type, clock skew)
//!         → rate_limit.rs (per-IP fixed window)
//!         → payload size
//!         → signature.rs (Ed25519 over timestamp ‖ body)
//!     → audit.rs (one entry per decision)
//!     → Pass to interaction dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Rejection reasons are logged, never returned to the client
//! - Rate-limit state is per process (best-effort across instances)

pub mod audit;
pub mod context;
pub mod headers;
pub mod rate_limit;
pub mod signature;
pub mod verification;

pub use audit::{AuditEventType, AuditLogEntry, AuditSink, TracingAuditSink};
pub use context::SecurityContext;
pub use headers::{validate_headers, HeaderError};
pub use rate_limit::{InMemoryRateLimitStore, RateLimitEntry, RateLimitStore, RateLimiter};
pub use signature::{Ed25519Verifier, SignatureVerifier, VerifierError};
pub use verification::{SecurityError, SecurityOrchestrator, Verification};
