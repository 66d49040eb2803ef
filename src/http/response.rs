//! Response construction.
//!
//! Rejections carry a generic body; the specific reason is logged and
//! audited, never returned.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::interactions::types::InteractionResponse;
use crate::security::SecurityError;

pub const INVALID_REQUEST_FORMAT: &str = "Invalid request format";

/// Response for a request that failed verification.
pub fn rejection(error: &SecurityError) -> Response {
    let status = error.status_code();
    let message = match status {
        StatusCode::TOO_MANY_REQUESTS => "Too many requests",
        StatusCode::PAYLOAD_TOO_LARGE => "Payload too large",
        _ => "Unauthorized",
    };
    (status, Json(json!({ "error": message }))).into_response()
}

/// 200 with an interaction envelope.
pub fn interaction(response: InteractionResponse) -> Response {
    (StatusCode::OK, Json(response)).into_response()
}

/// Verified body that is not valid interaction JSON. Still a 200.
pub fn invalid_format() -> Response {
    interaction(InteractionResponse::ephemeral(INVALID_REQUEST_FORMAT))
}

pub fn unsupported_type() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Unsupported interaction type" })),
    )
        .into_response()
}

/// Transport-level body cap exceeded before verification could run.
pub fn body_too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({ "error": "Payload too large" })),
    )
        .into_response()
}

pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// 204 CORS preflight.
pub fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-Signature-Ed25519, X-Signature-Timestamp"),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}
