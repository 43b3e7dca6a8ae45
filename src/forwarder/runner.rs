//! Bulk forward routine.
//!
//! Runs once per `/forward`:
//! 1. Fetch the full history of the source channel (fatal on failure)
//! 2. Sort it oldest first
//! 3. Announce the total
//! 4. Forward every message individually, counting failures
//! 5. Report `forwarded/total`

use tracing::{debug, error, info, warn};

use crate::telegram::{ChannelGateway, ReplySink};

/// Outcome of one bulk forward run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardReport {
    /// History could not be retrieved; nothing was forwarded.
    HistoryFailed(String),

    /// Every message was attempted.
    Completed {
        /// Messages forwarded successfully.
        forwarded: usize,
        /// Messages found in the source channel.
        total: usize,
    },
}

impl ForwardReport {
    /// Number of messages that failed to forward.
    #[must_use]
    pub fn failed(&self) -> usize {
        match self {
            Self::HistoryFailed(_) => 0,
            Self::Completed { forwarded, total } => total - forwarded,
        }
    }
}

/// Copies every message of `source` into `target`, reporting progress to
/// `reply`.
pub async fn run_bulk_forward<G, R>(
    gateway: &G,
    source: &str,
    target: &str,
    reply: &R,
) -> ForwardReport
where
    G: ChannelGateway + ?Sized,
    R: ReplySink + ?Sized,
{
    let mut messages = match gateway.list_history(source).await {
        Ok(messages) => messages,
        Err(e) => {
            error!("Failed to fetch history from {}: {}", source, e);
            send(reply, &format!("Error fetching history from {source}: {e}")).await;
            return ForwardReport::HistoryFailed(e.to_string());
        }
    };

    messages.sort_unstable_by_key(|m| m.id);
    let total = messages.len();

    info!("Forwarding {} messages from {} to {}", total, source, target);
    send(
        reply,
        &format!("Starting to forward {total} messages from {source} to {target}."),
    )
    .await;

    let mut forwarded = 0;
    for message in &messages {
        match gateway.forward(target, source, message.id).await {
            Ok(()) => {
                forwarded += 1;
                debug!("Forwarded message {}", message.id);
            }
            Err(e) => error!("Error forwarding message {}: {}", message.id, e),
        }
    }

    info!(
        "Forwarding from {} to {} complete: {}/{}",
        source, target, forwarded, total
    );
    send(
        reply,
        &format!("Forwarding complete. Successfully forwarded {forwarded}/{total} messages."),
    )
    .await;

    ForwardReport::Completed { forwarded, total }
}

async fn send<R: ReplySink + ?Sized>(reply: &R, text: &str) {
    if let Err(e) = reply.reply(text).await {
        warn!("Failed to send reply: {}", e);
    }
}
