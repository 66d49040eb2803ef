//! Discord member sync bot library.

pub mod clients;
pub mod clock;
pub mod config;
pub mod health;
pub mod http;
pub mod interactions;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod sync;
pub mod validation;

pub use config::schema::BotConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
