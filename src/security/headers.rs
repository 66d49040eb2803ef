//! Inbound header validation and outbound security headers.
//!
//! # Responsibilities
//! - Structural checks on Discord's signature headers (no cryptography)
//! - The constant set of security headers attached to every response
//!
//! # Design Decisions
//! - Checks short-circuit in a fixed order
//! - Clock skew is checked here, before any signature work

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";
pub const EXPECTED_CONTENT_TYPE: &str = "application/json";

/// Why a request's headers were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("Missing signature header")]
    MissingSignature,
    #[error("Missing timestamp header")]
    MissingTimestamp,
    #[error("Invalid Content-Type")]
    InvalidContentType,
    #[error("Request timestamp too old or too far in future")]
    TimestampOutOfRange,
}

/// Signature material pulled out of validated headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders<'a> {
    pub signature: &'a str,
    pub timestamp: &'a str,
}

/// Validate the structural headers of an interaction request.
///
/// `now_secs` is the current epoch time in seconds; `tolerance_secs` is the
/// largest allowed distance from the header timestamp in either direction.
pub fn validate_headers(
    headers: &HeaderMap,
    now_secs: i64,
    tolerance_secs: i64,
) -> Result<SignedHeaders<'_>, HeaderError> {
    let signature = non_empty(headers, SIGNATURE_HEADER).ok_or(HeaderError::MissingSignature)?;
    let timestamp = non_empty(headers, TIMESTAMP_HEADER).ok_or(HeaderError::MissingTimestamp)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type != Some(EXPECTED_CONTENT_TYPE) {
        return Err(HeaderError::InvalidContentType);
    }

    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| HeaderError::TimestampOutOfRange)?;
    if now_secs.abs_diff(sent_at) > tolerance_secs.unsigned_abs() {
        return Err(HeaderError::TimestampOutOfRange);
    }

    Ok(SignedHeaders {
        signature,
        timestamp,
    })
}

fn non_empty<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Headers attached to every outbound response.
pub fn security_response_headers() -> [(HeaderName, HeaderValue); 6] {
    [
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ),
    ]
}
