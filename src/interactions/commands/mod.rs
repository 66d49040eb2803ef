//! Built-in slash commands.

pub mod admin_sync;
pub mod ping;

pub use admin_sync::AdminSyncCommand;
pub use ping::PingCommand;
