//! Request verification: one pass/fail decision per inbound interaction.
//!
//! ```text
//! headers.rs (structure, clock skew)
//!     → rate_limit.rs (keyed on client IP)
//!     → payload size
//!     → signature.rs (timestamp ‖ body, under a deadline)
//! ```
//!
//! The context goes in and comes back out untouched on every path. The
//! caller learns only the outcome.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::clock::Clock;
use crate::config::SecurityConfig;
use crate::resilience::with_timeout;
use crate::security::context::SecurityContext;
use crate::security::headers::{validate_headers, HeaderError};
use crate::security::rate_limit::RateLimiter;
use crate::security::signature::SignatureVerifier;

/// Why a request failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Invalid Discord signature")]
    InvalidSignature,
    #[error("Verification error: {0}")]
    Verification(String),
}

impl SecurityError {
    /// HTTP status for the rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SecurityError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SecurityError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Short label for metrics.
    pub fn reason_label(&self) -> &'static str {
        match self {
            SecurityError::Header(HeaderError::MissingSignature) => "missing_signature",
            SecurityError::Header(HeaderError::MissingTimestamp) => "missing_timestamp",
            SecurityError::Header(HeaderError::InvalidContentType) => "content_type",
            SecurityError::Header(HeaderError::TimestampOutOfRange) => "timestamp",
            SecurityError::RateLimited => "rate_limited",
            SecurityError::PayloadTooLarge => "payload_too_large",
            SecurityError::InvalidSignature => "invalid_signature",
            SecurityError::Verification(_) => "verification_error",
        }
    }
}

/// Result of verification. Always carries the context it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub context: SecurityContext,
    pub outcome: Result<(), SecurityError>,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&SecurityError> {
        self.outcome.as_ref().err()
    }
}

/// Composes header checks, rate limiting, size limits and signature checks.
pub struct SecurityOrchestrator {
    rate_limiter: Arc<RateLimiter>,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn Clock>,
    max_payload_bytes: usize,
    timestamp_tolerance_secs: i64,
    verify_timeout: Duration,
}

impl SecurityOrchestrator {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        verifier: Arc<dyn SignatureVerifier>,
        clock: Arc<dyn Clock>,
        config: &SecurityConfig,
    ) -> Self {
        Self {
            rate_limiter,
            verifier,
            clock,
            max_payload_bytes: config.max_payload_bytes,
            timestamp_tolerance_secs: config.timestamp_tolerance_secs,
            verify_timeout: Duration::from_millis(config.verify_timeout_ms),
        }
    }

    /// Verify one request. Never panics on bad input; every failure becomes
    /// a [`SecurityError`].
    pub async fn verify_request_secure(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        public_key: &str,
        context: SecurityContext,
    ) -> Verification {
        let outcome = self.run_checks(headers, body, public_key, &context).await;
        Verification { context, outcome }
    }

    async fn run_checks(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        public_key: &str,
        context: &SecurityContext,
    ) -> Result<(), SecurityError> {
        let signed = validate_headers(headers, self.clock.now_secs(), self.timestamp_tolerance_secs)?;

        if !self.rate_limiter.check_and_consume(&context.client_ip) {
            return Err(SecurityError::RateLimited);
        }

        if body.len() > self.max_payload_bytes {
            return Err(SecurityError::PayloadTooLarge);
        }

        let verified = with_timeout(
            self.verifier
                .verify(body, signed.signature, signed.timestamp, public_key),
            self.verify_timeout,
        )
        .await
        .map_err(|e| SecurityError::Verification(e.to_string()))?
        .map_err(|e| SecurityError::Verification(e.to_string()))?;

        if verified {
            Ok(())
        } else {
            Err(SecurityError::InvalidSignature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RateLimitConfig;
    use crate::security::headers::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use crate::security::rate_limit::InMemoryRateLimitStore;
    use async_trait::async_trait;
    use axum::http::{header, HeaderValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    const NOW_MS: i64 = 1_700_000_000_000;

    #[derive(Default)]
    struct StubVerifier {
        answer: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SignatureVerifier for StubVerifier {
        async fn verify(&self, _: &[u8], _: &str, _: &str, _: &str) -> Result<bool, crate::security::signature::VerifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    struct StalledVerifier;

    #[async_trait]
    impl SignatureVerifier for StalledVerifier {
        async fn verify(&self, _: &[u8], _: &str, _: &str, _: &str) -> Result<bool, crate::security::signature::VerifierError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        }
    }

    fn orchestrator(verifier: Arc<dyn SignatureVerifier>) -> SecurityOrchestrator {
        let clock = Arc::new(ManualClock::new(NOW_MS));
        let limiter = Arc::new(RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            clock.clone(),
            &RateLimitConfig::default(),
        ));
        SecurityOrchestrator::new(limiter, verifier, clock, &SecurityConfig::default())
    }

    fn signed_headers(ts_secs: i64) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(SIGNATURE_HEADER, HeaderValue::from_static("ab"));
        h.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&ts_secs.to_string()).unwrap());
        h.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h
    }

    fn context() -> SecurityContext {
        SecurityContext::new("198.51.100.1", "test", NOW_MS, Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_accepts_and_returns_same_context() {
        let orch = orchestrator(Arc::new(StubVerifier { answer: true, ..Default::default() }));
        let ctx = context();
        let result = orch
            .verify_request_secure(&signed_headers(NOW_MS / 1000), b"{}", "key", ctx.clone())
            .await;
        assert!(result.is_valid());
        assert_eq!(result.context, ctx);
    }

    #[tokio::test]
    async fn test_stale_timestamp_rejected_before_signature() {
        let verifier = Arc::new(StubVerifier { answer: true, ..Default::default() });
        let orch = orchestrator(verifier.clone());
        let result = orch
            .verify_request_secure(&signed_headers(NOW_MS / 1000 - 301), b"{}", "key", context())
            .await;
        assert_eq!(
            result.error(),
            Some(&SecurityError::Header(HeaderError::TimestampOutOfRange))
        );
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_payload_boundary() {
        let orch = orchestrator(Arc::new(StubVerifier { answer: true, ..Default::default() }));
        let headers = signed_headers(NOW_MS / 1000);

        let exact = vec![b' '; 1024 * 1024];
        let result = orch.verify_request_secure(&headers, &exact, "key", context()).await;
        assert!(result.is_valid());

        let over = vec![b' '; 1024 * 1024 + 1];
        let result = orch.verify_request_secure(&headers, &over, "key", context()).await;
        assert_eq!(result.error(), Some(&SecurityError::PayloadTooLarge));
        assert_eq!(result.error().unwrap().status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_bad_signature() {
        let orch = orchestrator(Arc::new(StubVerifier::default()));
        let result = orch
            .verify_request_secure(&signed_headers(NOW_MS / 1000), b"{}", "key", context())
            .await;
        assert_eq!(result.error(), Some(&SecurityError::InvalidSignature));
        assert_eq!(result.error().unwrap().to_string(), "Invalid Discord signature");
    }

    #[tokio::test]
    async fn test_rate_limit_runs_before_signature() {
        let verifier = Arc::new(StubVerifier { answer: true, ..Default::default() });
        let orch = orchestrator(verifier.clone());
        let headers = signed_headers(NOW_MS / 1000);

        for _ in 0..100 {
            assert!(orch.verify_request_secure(&headers, b"{}", "key", context()).await.is_valid());
        }
        let result = orch.verify_request_secure(&headers, b"{}", "key", context()).await;
        assert_eq!(result.error(), Some(&SecurityError::RateLimited));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_verifier_becomes_verification_error() {
        let orch = orchestrator(Arc::new(StalledVerifier));
        let result = orch
            .verify_request_secure(&signed_headers(NOW_MS / 1000), b"{}", "key", context())
            .await;
        assert_eq!(
            result.error().map(ToString::to_string).as_deref(),
            Some("Verification error: Operation timed out after 10000ms")
        );
    }
}
