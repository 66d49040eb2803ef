//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides, .env already loaded)
//!     → validation.rs (semantic checks)
//!     → BotConfig (validated, immutable)
//!     → shared by value/Arc with all subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BotConfig, DiscordConfig, GoogleConfig, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, SecurityConfig, SyncConfig, TimeoutConfig,
};
