//! Audit trail for security-relevant events.
//!
//! Entries are written once to the `audit` tracing target as JSON and never
//! read back.

use std::fmt::Debug;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::security::context::SecurityContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    RequestVerified,
    SecurityViolation,
    RateLimitExceeded,
    CommandExecuted,
    AdminCommandDenied,
    SyncAccepted,
    SyncRejected,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub timestamp: String,
    pub request_id: Uuid,
    pub event_type: AuditEventType,
    #[serde(rename = "clientIP")]
    pub client_ip: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_name: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "responseTime", skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuditLogEntry {
    /// Start an entry from the request context. `now` is epoch milliseconds.
    pub fn new(context: &SecurityContext, event_type: AuditEventType, success: bool, now: i64) -> Self {
        let timestamp = Utc
            .timestamp_millis_opt(now)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        Self {
            timestamp,
            request_id: context.request_id,
            event_type,
            client_ip: context.client_ip.clone(),
            user_agent: context.user_agent.clone(),
            user_id: None,
            guild_id: None,
            channel_id: None,
            command_name: None,
            success,
            error: None,
            response_time_ms: Some(now - context.timestamp),
            metadata: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_command(mut self, name: impl Into<String>) -> Self {
        self.command_name = Some(name.into());
        self
    }

    pub fn with_user(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_string);
        self
    }

    pub fn with_location(mut self, guild_id: Option<&str>, channel_id: Option<&str>) -> Self {
        self.guild_id = guild_id.map(str::to_string);
        self.channel_id = channel_id.map(str::to_string);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync + Debug {
    fn record(&self, entry: &AuditLogEntry);
}

/// Writes entries to the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditLogEntry) {
        let json = match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize audit entry");
                return;
            }
        };

        if entry.success {
            tracing::info!(target: "audit", request_id = %entry.request_id, event = %json);
        } else {
            tracing::warn!(target: "audit", request_id = %entry.request_id, event = %json);
        }
    }
}
