//! Request identity.
//!
//! # Responsibilities
//! - Assign a UUID v4 `x-request-id` when the caller did not send one, or
//!   sent one that is not a UUID
//! - Echo the id on the response
//! - Recover the peer address without requiring `ConnectInfo` to exist
//!
//! # Design Decisions
//! - The id is set before any handler runs so every log line can carry it
//! - Missing `ConnectInfo` (in-process tests) falls back to header-derived IPs

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use axum::body::Body;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer assigning `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Drop a caller-sent `x-request-id` that is not a UUID so a fresh one is
/// assigned. Runs before [`set_request_id_layer`].
pub fn discard_foreign_request_id(mut request: Request<Body>) -> Request<Body> {
    let is_uuid = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| Uuid::parse_str(v).is_ok());
    if !is_uuid {
        request.headers_mut().remove(&X_REQUEST_ID);
    }
    request
}

/// Layer copying `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Socket peer, when the server was started with connect info.
pub fn peer_addr<B>(request: &Request<B>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
