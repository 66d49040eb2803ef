//! Configuration validation.
//!
//! Serde handles syntax; this checks values. All problems are reported at
//! once rather than stopping at the first.
//!
//! Missing admin or Google settings are not errors here: the bot can still
//! answer pings without them, and the health check reports them.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::BotConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BotConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let key = config.discord.public_key.trim();
    if !key.is_empty() && (key.len() != 64 || hex::decode(key).is_err()) {
        errors.push(ValidationError::new(
            "discord.public_key",
            "must be 64 hex characters",
        ));
    }

    let security = &config.security;
    if security.max_payload_bytes == 0 {
        errors.push(ValidationError::new(
            "security.max_payload_bytes",
            "must be greater than zero",
        ));
    }
    if security.max_body_size <= security.max_payload_bytes {
        errors.push(ValidationError::new(
            "security.max_body_size",
            "must be larger than security.max_payload_bytes",
        ));
    }
    if security.timestamp_tolerance_secs <= 0 {
        errors.push(ValidationError::new(
            "security.timestamp_tolerance_secs",
            "must be greater than zero",
        ));
    }
    if security.verify_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "security.verify_timeout_ms",
            "must be greater than zero",
        ));
    }
    if security.rate_limit.max_requests == 0 || security.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new(
            "security.rate_limit",
            "max_requests and window_secs must be greater than zero",
        ));
    }
    if !(0.0..=1.0).contains(&security.rate_limit.sweep_probability) {
        errors.push(ValidationError::new(
            "security.rate_limit.sweep_probability",
            "must be between 0 and 1",
        ));
    }

    let sync = &config.sync;
    if sync.page_size == 0 || sync.page_size > 1000 {
        errors.push(ValidationError::new("sync.page_size", "must be in 1..=1000"));
    }
    if sync.write_batch_size == 0 {
        errors.push(ValidationError::new(
            "sync.write_batch_size",
            "must be greater than zero",
        ));
    }
    if sync.phase_timeout_secs == 0 || sync.background_budget_secs < sync.phase_timeout_secs {
        errors.push(ValidationError::new(
            "sync.background_budget_secs",
            "must be at least sync.phase_timeout_secs, which must be non-zero",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}'", other),
        )),
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
