//! Command handler implementation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{BotCommand, CommandResult};
use crate::config::{ChannelStore, NOT_SET};
use crate::forwarder::ForwardRegistry;
use crate::telegram::{ChannelGateway, ReplySink};

/// Handles bot commands against the shared channel configuration.
pub struct CommandHandler {
    /// Persisted source/target pair.
    store: Arc<RwLock<ChannelStore>>,

    /// Backend used by forward routines.
    gateway: Arc<dyn ChannelGateway>,

    /// Running forward routines.
    registry: ForwardRegistry,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        store: Arc<RwLock<ChannelStore>>,
        gateway: Arc<dyn ChannelGateway>,
        registry: ForwardRegistry,
    ) -> Self {
        Self {
            store,
            gateway,
            registry,
        }
    }

    /// Handles an incoming message and sends the reply, if any.
    pub async fn handle_message(&self, text: &str, is_private: bool, reply: Arc<dyn ReplySink>) {
        let Some(result) = self.try_handle(text, is_private, Arc::clone(&reply)).await else {
            return;
        };

        if let Some(message) = result.message
            && let Err(e) = reply.reply(&message).await
        {
            warn!("Failed to send reply: {}", e);
        }
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `None` if the message is not a command or was not sent in a
    /// private chat.
    pub async fn try_handle(
        &self,
        text: &str,
        is_private: bool,
        reply: Arc<dyn ReplySink>,
    ) -> Option<CommandResult> {
        if !is_private {
            return None;
        }
        let command = BotCommand::parse(text)?;

        debug!("Handling command: {}", command);
        let result = self.execute(command, reply).await;
        info!("Command result: success={}", result.success);

        Some(result)
    }

    /// Executes a parsed command.
    async fn execute(&self, command: BotCommand, reply: Arc<dyn ReplySink>) -> CommandResult {
        match command {
            BotCommand::SetSource(arg) => self.handle_set_source(arg.as_deref()).await,
            BotCommand::SetForward(arg) => self.handle_set_forward(arg.as_deref()).await,
            BotCommand::Status => self.handle_status().await,
            BotCommand::Forward => self.handle_forward(reply).await,
            BotCommand::Help => Self::handle_help(),
        }
    }

    async fn handle_set_source(&self, channel: Option<&str>) -> CommandResult {
        let Some(channel) = channel else {
            return CommandResult::error("Usage: /setsource <channel_username_or_id>");
        };

        let mut store = self.store.write().await;
        if let Err(e) = store.set_source(channel) {
            warn!("Failed to save config: {}", e);
            return CommandResult::error(format!("Failed to save configuration: {e}"));
        }

        info!("Source channel set to {}", channel);
        CommandResult::success(format!("Source channel set to: {channel}"))
    }

    async fn handle_set_forward(&self, channel: Option<&str>) -> CommandResult {
        let Some(channel) = channel else {
            return CommandResult::error("Usage: /setforward <channel_username_or_id>");
        };

        let mut store = self.store.write().await;
        if let Err(e) = store.set_target(channel) {
            warn!("Failed to save config: {}", e);
            return CommandResult::error(format!("Failed to save configuration: {e}"));
        }

        info!("Forward channel set to {}", channel);
        CommandResult::success(format!("Forward channel set to: {channel}"))
    }

    async fn handle_status(&self) -> CommandResult {
        let store = self.store.read().await;

        let message = format!(
            "Current configuration:\n\
             Source: {}\n\
             Target: {}",
            store.source().unwrap_or(NOT_SET),
            store.target().unwrap_or(NOT_SET),
        );

        CommandResult::success(message)
    }

    async fn handle_forward(&self, reply: Arc<dyn ReplySink>) -> CommandResult {
        let Some((source, target)) = self.store.read().await.forward_pair() else {
            return CommandResult::error(
                "Both source and target channels must be set. Use /setsource and /setforward commands.",
            );
        };

        match self
            .registry
            .spawn(Arc::clone(&self.gateway), source, target, reply)
            .await
        {
            // The routine reports its own progress
            Ok(_) => CommandResult::silent(),
            Err(e) => CommandResult::error(e.to_string()),
        }
    }

    fn handle_help() -> CommandResult {
        let mut lines = vec!["Available commands:".to_owned()];
        for (usage, description) in BotCommand::all_commands() {
            lines.push(format!("/{usage} - {description}"));
        }
        CommandResult::success(lines.join("\n"))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
