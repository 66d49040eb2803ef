//! Errors from outbound REST collaborators.

use thiserror::Error;

/// Failure talking to Discord or Google.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Non-success HTTP status with the upstream's message.
    #[error("{service} returned {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Connection, TLS or transport failure.
    #[error("{service} request failed: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    /// The response body was not what the API documents.
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// Credentials were rejected or could not be turned into a token.
    #[error("{service} authentication failed: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },

    /// Kept hitting 429 after the allowed number of waits.
    #[error("{service} rate limit persisted after {retries} retries")]
    RateLimited { service: &'static str, retries: u32 },

    /// A single call exceeded its deadline.
    #[error("{service} call timed out: {message}")]
    Timeout {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub(crate) fn network(service: &'static str, err: reqwest::Error) -> Self {
        UpstreamError::Network {
            service,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(service: &'static str, err: impl std::fmt::Display) -> Self {
        UpstreamError::Decode {
            service,
            message: err.to_string(),
        }
    }

    /// HTTP status when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Turn an error response into [`UpstreamError::Status`], keeping the
/// upstream's `message` field when the body is JSON.
pub(crate) async fn status_error(service: &'static str, response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.pointer("/error/message"))
                .or_else(|| v.get("error_description"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(text);

    UpstreamError::Status {
        service,
        status,
        message,
    }
}
