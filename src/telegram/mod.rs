//! Telegram client wrapper module.
//!
//! Provides the grammers-backed bot session and the narrow capability
//! traits the forwarding logic is written against.

mod client;
mod gateway;

pub use client::{IncomingMessage, TelegramBot, TelegramError};
pub use gateway::{ChannelGateway, MessageRef, ReplySink};
