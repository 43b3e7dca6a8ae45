//! Configuration module for the forward bot.
//!
//! Handles the persisted channel pair as well as Telegram credentials
//! and runtime settings taken from the environment.

mod channels;
mod settings;

pub use channels::{ChannelConfig, ChannelStore, StoreError};
pub use settings::{BotSettings, ConfigError, TelegramConfig};

/// Placeholder shown for a channel that has not been configured.
pub const NOT_SET: &str = "Not set";
