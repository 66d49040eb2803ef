//! Discord interaction handling.
//!
//! # Data Flow
//! ```text
//! Verified body
//!     → types.rs (serde model)
//!     → dispatcher.rs
//!         → PING: PONG
//!         → APPLICATION_COMMAND: commands/* by name
//!         → other: Unsupported (HTTP 400)
//! ```

pub mod commands;
pub mod dispatcher;
pub mod types;

pub use dispatcher::{CommandError, CommandHandler, DispatchOutcome, InteractionDispatcher};
pub use types::{Interaction, InteractionResponse, InteractionType};
