//! Sync requests and their synchronous validation.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::clients::error::UpstreamError;
use crate::resilience::TimeoutError;
use crate::sync::credentials::{is_bot_token_shape, CredentialsError, SyncCredentials};

static GUILD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{17,19}$").expect("guild id pattern compiles"));

/// A request to copy a guild's members into the spreadsheet.
///
/// Built once at command entry and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOperation {
    pub guild_id: String,
    pub credentials: SyncCredentials,
    /// Caller-supplied id; empty means "assign one".
    pub request_id: String,
    pub initiated_by: String,
    /// RFC 3339 with millisecond precision and `Z` suffix.
    pub timestamp: String,
    pub estimated_member_count: Option<u64>,
    pub spreadsheet_id: String,
}

impl SyncOperation {
    /// Epoch milliseconds in the format `timestamp` must use.
    pub fn format_timestamp(now_ms: i64) -> String {
        DateTime::<Utc>::from_timestamp_millis(now_ms)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Invalid guild ID format")]
    InvalidGuildId,
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] CredentialsError),
    #[error("Invalid timestamp format")]
    InvalidTimestamp,
    #[error("Invalid bot token format")]
    InvalidBotToken,
    #[error("Guild exceeds maximum supported size of {max} members")]
    GuildTooLarge { max: u64 },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

/// Validate a sync request. Checks run in a fixed order and stop at the
/// first failure.
pub fn validate_sync_operation(operation: &SyncOperation, max_guild_members: u64) -> Result<(), SyncError> {
    if !GUILD_ID_RE.is_match(&operation.guild_id) {
        return Err(SyncError::InvalidGuildId);
    }

    operation.credentials.service_account.validate()?;

    if !is_round_trip_timestamp(&operation.timestamp) {
        return Err(SyncError::InvalidTimestamp);
    }

    if !is_bot_token_shape(&operation.credentials.bot_token) {
        return Err(SyncError::InvalidBotToken);
    }

    if operation
        .estimated_member_count
        .is_some_and(|count| count > max_guild_members)
    {
        return Err(SyncError::GuildTooLarge {
            max: max_guild_members,
        });
    }

    Ok(())
}

/// True when `timestamp` parses as RFC 3339 and formats back identically.
pub fn is_round_trip_timestamp(timestamp: &str) -> bool {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true) == timestamp)
        .unwrap_or(false)
}

/// Caller's id when non-empty, otherwise a fresh UUID.
pub fn resolve_request_id(requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Human-readable duration band for the acceptance message.
pub fn estimate_duration(member_count: Option<u64>) -> &'static str {
    match member_count.unwrap_or(0) {
        0..=1_000 => "2-5 minutes",
        1_001..=10_000 => "5-10 minutes",
        _ => "10-15 minutes",
    }
}
