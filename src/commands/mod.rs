//! Command handling module.
//!
//! Processes `/setsource`, `/setforward`, `/status` and `/forward`
//! sent to the bot in private chats.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{BotCommand, CommandResult};
