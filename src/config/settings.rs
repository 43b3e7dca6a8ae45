//! Application settings and Telegram configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Telegram API configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Token issued by `@BotFather`.
    pub bot_token: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("forward_bot.session")
}

impl TelegramConfig {
    /// Creates configuration from environment variables.
    ///
    /// Expects `API_ID`, `API_HASH` and `BOT_TOKEN` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_id: i32 = lookup("API_ID")
            .ok_or(ConfigError::MissingEnvVar("API_ID"))?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash = required(&lookup, "API_HASH")?;
        let bot_token = required(&lookup, "BOT_TOKEN")?;

        let session_path = lookup("SESSION_PATH").map_or_else(default_session_path, PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            session_path,
        })
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_id", &self.api_id)
            .field("session_path", &self.session_path)
            .finish_non_exhaustive()
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnvVar(key))
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the channel configuration JSON file.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Address the health endpoint listens on.
    #[serde(default = "default_health_addr")]
    pub health_addr: SocketAddr,

    /// Reject a `/forward` while another one to the same target is running.
    #[serde(default)]
    pub single_flight: bool,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("config.json")
}

fn default_health_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            health_addr: default_health_addr(),
            single_flight: false,
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            config_path: lookup("CONFIG_PATH").map_or_else(default_config_path, PathBuf::from),
            health_addr: lookup("HEALTH_ADDR")
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_health_addr),
            single_flight: lookup("FORWARD_SINGLE_FLIGHT")
                .is_some_and(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be an integer)")]
    InvalidApiId,
}
