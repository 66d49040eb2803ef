//! Outbound REST collaborators.
//!
//! # Data Flow
//! ```text
//! Background sync workload
//!     → discord.rs (member listing, paginated, 429-aware)
//!     → sheets.rs (OAuth token exchange, values read, batch update)
//!     → error.rs (status + upstream message, logged with request id)
//! ```
//!
//! # Design Decisions
//! - Both clients implement the sync ports so tests can swap them out
//! - Every call has a deadline (resilience::timeouts)
//! - One shared `reqwest::Client` (connection pooling)

pub mod discord;
pub mod error;
pub mod sheets;

pub use discord::{DiscordClient, DiscordClientSettings, GuildMember};
pub use error::UpstreamError;
pub use sheets::{GoogleSheetsConnector, SheetsClient};
