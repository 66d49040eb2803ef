//! Per-request security context.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use uuid::Uuid;

/// Identity of one inbound request, captured once at the HTTP boundary.
///
/// Immutable. Used for audit records and rate-limit keying only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityContext {
    pub client_ip: String,
    pub user_agent: String,
    /// Epoch milliseconds at arrival.
    pub timestamp: i64,
    pub request_id: Uuid,
}

impl SecurityContext {
    pub fn new(
        client_ip: impl Into<String>,
        user_agent: impl Into<String>,
        timestamp: i64,
        request_id: Uuid,
    ) -> Self {
        Self {
            client_ip: client_ip.into(),
            user_agent: user_agent.into(),
            timestamp,
            request_id,
        }
    }

    /// Build the context from request headers and the socket peer.
    ///
    /// The request id is taken from `x-request-id` when it is a UUID so the
    /// audit trail matches the id tower-http put on the response.
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>, timestamp: i64) -> Self {
        let request_id = header_str(headers, "x-request-id")
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::new_v4);

        let user_agent = header_str(headers, "user-agent")
            .unwrap_or("unknown")
            .to_string();

        Self {
            client_ip: client_ip(headers, peer),
            user_agent,
            timestamp,
            request_id,
        }
    }
}

/// Resolve the client address.
///
/// Order: `CF-Connecting-IP`, first `X-Forwarded-For` hop, `X-Real-IP`, the
/// socket peer, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_str(headers, "cf-connecting-ip") {
        return ip.trim().to_string();
    }
    if let Some(first) = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(ip) = header_str(headers, "x-real-ip") {
        return ip.trim().to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}
