//! Capabilities the forwarding logic needs from the messaging backend.

use async_trait::async_trait;

use super::TelegramError;

/// Reference to a single message inside a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageRef {
    /// Per-channel message identifier.
    pub id: i32,
}

impl MessageRef {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self { id }
    }
}

/// History retrieval and message forwarding between channels.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Returns every message currently present in `channel`, in no
    /// particular order.
    async fn list_history(&self, channel: &str) -> Result<Vec<MessageRef>, TelegramError>;

    /// Forwards message `message_id` of `source` into `target`.
    async fn forward(
        &self,
        target: &str,
        source: &str,
        message_id: i32,
    ) -> Result<(), TelegramError>;
}

/// Destination for plain-text replies to the chat that issued a command.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn reply(&self, text: &str) -> Result<(), TelegramError>;
}
