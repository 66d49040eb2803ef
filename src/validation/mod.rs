//! Authorization chain for privileged commands.
//!
//! # Data Flow
//! ```text
//! Verified interaction
//!     → validate_interaction_structure (id, type, token, version, data)
//!     → validate_user_and_environment (invoking user, admin settings)
//!     → validate_channel_permissions (admin channel, admin user)
//!     → AuthorizedInvocation
//! ```
//!
//! # Design Decisions
//! - Each stage returns a `ValidationResult`; the first failure wins
//! - Failures are values the caller logs and turns into an ephemeral reply
//! - Runs only after signature verification, so failures here are
//!   authorization problems, never client-protocol problems

pub mod pipeline;

pub use pipeline::{
    validate_channel_permissions, validate_interaction_structure, validate_privileged_command,
    validate_user_and_environment, AuthorizedInvocation, PrivilegedInvocation, ValidationFailure,
    ValidationResult,
};
