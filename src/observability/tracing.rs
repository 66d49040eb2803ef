//! Request spans.
//!
//! Every interaction runs inside one span carrying the request id and client
//! IP, so handler and audit events correlate without passing ids around.

use tracing::Span;

use crate::security::SecurityContext;

/// Span for one inbound interaction.
pub fn request_span(method: &str, context: &SecurityContext) -> Span {
    tracing::info_span!(
        "interaction",
        method = %method,
        request_id = %context.request_id,
        client_ip = %context.client_ip,
        command = tracing::field::Empty,
    )
}

/// Fill the `command` field once the body has been parsed.
pub fn record_command(span: &Span, command: &str) {
    span.record("command", command);
}
