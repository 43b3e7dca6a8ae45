//! Telegram client wrapper for channel forwarding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::UpdatesConfiguration;
use grammers_client::message::Message;
use grammers_client::update::Update;
use grammers_client::{sender, Client, InvocationError, SenderPool};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ChannelGateway, MessageRef, ReplySink};
use crate::config::TelegramConfig;

/// Messages fetched per `messages.getHistory` call.
const HISTORY_PAGE_SIZE: i32 = 100;

/// Offset between Bot API style ids (`-100…`) and raw channel ids.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        if let InvocationError::Rpc(rpc) = &err
            && let Some(seconds) = flood_wait_seconds(&rpc.name, rpc.value)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err.to_string())
    }
}

/// Returns the wait time carried by a flood-wait RPC error.
///
/// grammers splits `FLOOD_WAIT_120` into the name `FLOOD_WAIT` and the
/// value `120`.
fn flood_wait_seconds(name: &str, value: Option<u32>) -> Option<u32> {
    match name {
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" => value,
        _ => None,
    }
}

/// A text message received by the bot.
pub struct IncomingMessage {
    /// Message text.
    pub text: String,

    /// Whether the message was sent in a one-to-one chat.
    pub is_private: bool,

    /// Where replies to this message go.
    pub reply: Arc<dyn ReplySink>,
}

impl std::fmt::Debug for IncomingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingMessage")
            .field("text", &self.text)
            .field("is_private", &self.is_private)
            .finish_non_exhaustive()
    }
}

impl IncomingMessage {
    fn from_update(message: Message) -> Option<Self> {
        let tl::enums::Message::Message(raw) = &message.raw else {
            return None;
        };
        if raw.out {
            return None;
        }

        let is_private = matches!(raw.peer_id, tl::enums::Peer::User(_));
        Some(Self {
            text: message.text().to_owned(),
            is_private,
            reply: Arc::new(MessageReply(message)),
        })
    }
}

/// Replies in the chat an incoming message came from.
struct MessageReply(Message);

#[async_trait]
impl ReplySink for MessageReply {
    async fn reply(&self, text: &str) -> Result<(), TelegramError> {
        self.0.reply(text).await?;
        Ok(())
    }
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Resolved channel identifiers.
    peers: RwLock<HashMap<String, tl::enums::InputPeer>>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,

    /// Background task pumping updates into the dispatch channel.
    _update_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram, signs in as a bot and starts receiving updates.
    ///
    /// Returns the bot together with the stream of incoming text messages.
    /// The stream ends when the update connection fails.
    pub async fn start(
        config: &TelegramConfig,
    ) -> Result<(Self, mpsc::Receiver<IncomingMessage>), TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        if !is_authorized {
            info!("Signing in with bot token...");
            client
                .bot_sign_in(&config.bot_token, &config.api_hash)
                .await
                .map_err(|e| TelegramError::SignInFailed(e.to_string()))?;
            info!("Signed in as bot");
        }

        let mut stream = client
            .stream_updates(
                updates,
                UpdatesConfiguration {
                    catch_up: false,
                    ..Default::default()
                },
            )
            .await;

        let (tx, rx) = mpsc::channel(64);
        let update_task = tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Ok(Update::NewMessage(message)) => {
                        let Some(incoming) = IncomingMessage::from_update(message.into_inner()) else {
                            continue;
                        };
                        if tx.send(incoming).await.is_err() {
                            debug!("Dispatcher gone, stopping update pump");
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Update stream failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                client,
                handle: handle.thin,
                peers: RwLock::new(HashMap::new()),
                _pool_task: pool_task,
                _update_task: update_task,
            },
            rx,
        ))
    }

    /// Resolves a channel username or numeric id to an input peer.
    async fn resolve(&self, channel: &str) -> Result<tl::enums::InputPeer, TelegramError> {
        if let Some(peer) = self.peers.read().await.get(channel) {
            return Ok(peer.clone());
        }

        let peer = match channel.parse::<i64>() {
            Ok(id) => self.resolve_numeric(channel, id).await?,
            Err(_) => self.resolve_username(channel).await?,
        };

        debug!("Resolved {} to {:?}", channel, peer);
        self.peers
            .write()
            .await
            .insert(channel.to_owned(), peer.clone());
        Ok(peer)
    }

    async fn resolve_username(&self, channel: &str) -> Result<tl::enums::InputPeer, TelegramError> {
        let username = normalize_username(channel);

        let request = tl::functions::contacts::ResolveUsername {
            username: username.to_owned(),
            referer: None,
        };

        let tl::enums::contacts::ResolvedPeer::Peer(resolved) = self
            .client
            .invoke(&request)
            .await
            .map_err(|e| TelegramError::ChannelNotFound(format!("{channel}: {e}")))?;

        match resolved.peer {
            tl::enums::Peer::Channel(p) => resolved
                .chats
                .into_iter()
                .find_map(|chat| match chat {
                    tl::enums::Chat::Channel(c) if c.id == p.channel_id => {
                        Some(input_channel(c.id, c.access_hash.unwrap_or(0)))
                    }
                    _ => None,
                })
                .ok_or_else(|| TelegramError::ChannelNotFound(channel.to_owned())),
            tl::enums::Peer::Chat(p) => Ok(tl::enums::InputPeer::Chat(tl::types::InputPeerChat {
                chat_id: p.chat_id,
            })),
            tl::enums::Peer::User(_) => Err(TelegramError::ChannelNotFound(format!(
                "{channel} is a user, not a channel"
            ))),
        }
    }

    async fn resolve_numeric(
        &self,
        channel: &str,
        id: i64,
    ) -> Result<tl::enums::InputPeer, TelegramError> {
        let channel_id = match split_numeric_id(id) {
            NumericPeer::Chat(chat_id) => {
                return Ok(tl::enums::InputPeer::Chat(tl::types::InputPeerChat { chat_id }));
            }
            NumericPeer::Channel(channel_id) => channel_id,
        };

        let request = tl::functions::channels::GetChannels {
            id: vec![tl::enums::InputChannel::Channel(tl::types::InputChannel {
                channel_id,
                access_hash: 0,
            })],
        };

        let chats = match self.client.invoke(&request).await {
            Ok(tl::enums::messages::Chats::Chats(c)) => c.chats,
            Ok(tl::enums::messages::Chats::Slice(c)) => c.chats,
            Err(e) => return Err(TelegramError::ChannelNotFound(format!("{channel}: {e}"))),
        };

        chats
            .into_iter()
            .find_map(|chat| match chat {
                tl::enums::Chat::Channel(c) if c.id == channel_id => {
                    Some(input_channel(c.id, c.access_hash.unwrap_or(0)))
                }
                _ => None,
            })
            .ok_or_else(|| TelegramError::ChannelNotFound(channel.to_owned()))
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

#[async_trait]
impl ChannelGateway for TelegramBot {
    async fn list_history(&self, channel: &str) -> Result<Vec<MessageRef>, TelegramError> {
        let peer = self.resolve(channel).await?;
        let mut refs = Vec::new();
        let mut offset_id = 0;

        loop {
            let request = tl::functions::messages::GetHistory {
                peer: peer.clone(),
                offset_id,
                offset_date: 0,
                add_offset: 0,
                limit: HISTORY_PAGE_SIZE,
                max_id: 0,
                min_id: 0,
                hash: 0,
            };

            let messages = match self.client.invoke(&request).await? {
                tl::enums::messages::Messages::Messages(m) => m.messages,
                tl::enums::messages::Messages::Slice(m) => m.messages,
                tl::enums::messages::Messages::ChannelMessages(m) => m.messages,
                tl::enums::messages::Messages::NotModified(_) => Vec::new(),
            };

            let Some(oldest) = next_offset(&messages) else {
                break;
            };

            let page: Vec<MessageRef> = messages.iter().filter_map(message_ref).collect();
            debug!("Fetched {} messages from {} (oldest id {})", page.len(), channel, oldest);
            refs.extend(page);
            offset_id = oldest;
        }

        info!("Retrieved {} messages from {}", refs.len(), channel);
        Ok(refs)
    }

    async fn forward(
        &self,
        target: &str,
        source: &str,
        message_id: i32,
    ) -> Result<(), TelegramError> {
        let from_peer = self.resolve(source).await?;
        let to_peer = self.resolve(target).await?;

        let request = tl::functions::messages::ForwardMessages {
            silent: false,
            background: false,
            with_my_score: false,
            drop_author: false,
            drop_media_captions: false,
            noforwards: false,
            allow_paid_floodskip: false,
            from_peer,
            id: vec![message_id],
            random_id: vec![rand::random::<i64>()],
            to_peer,
            top_msg_id: None,
            reply_to: None,
            schedule_date: None,
            send_as: None,
            quick_reply_shortcut: None,
            video_timestamp: None,
            allow_paid_stars: None,
            suggested_post: None,
            effect: None,
            schedule_repeat_period: None,
        };

        match self.client.invoke(&request).await {
            Ok(_updates) => Ok(()),
            Err(e) => {
                let err: TelegramError = e.into();
                if let TelegramError::FloodWait(seconds) = &err {
                    warn!("Flood wait triggered while forwarding: {} seconds", seconds);
                }
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

/// Offset for the next `getHistory` page, `None` once the history is
/// exhausted. Empty slots still advance the offset.
fn next_offset(page: &[tl::enums::Message]) -> Option<i32> {
    page.iter().map(message_id).min()
}

fn message_id(message: &tl::enums::Message) -> i32 {
    match message {
        tl::enums::Message::Message(m) => m.id,
        tl::enums::Message::Service(m) => m.id,
        tl::enums::Message::Empty(m) => m.id,
    }
}

fn message_ref(message: &tl::enums::Message) -> Option<MessageRef> {
    match message {
        tl::enums::Message::Message(m) => Some(MessageRef::new(m.id)),
        tl::enums::Message::Service(m) => Some(MessageRef::new(m.id)),
        tl::enums::Message::Empty(_) => None,
    }
}

fn input_channel(channel_id: i64, access_hash: i64) -> tl::enums::InputPeer {
    tl::enums::InputPeer::Channel(tl::types::InputPeerChannel {
        channel_id,
        access_hash,
    })
}

/// Strips `@` and `t.me` link prefixes from a channel username.
fn normalize_username(channel: &str) -> &str {
    let trimmed = channel.trim();
    let trimmed = ["https://t.me/", "http://t.me/", "t.me/"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    trimmed.trim_start_matches('@').trim_end_matches('/')
}

#[derive(Debug, PartialEq, Eq)]
enum NumericPeer {
    Chat(i64),
    Channel(i64),
}

/// Interprets a numeric identifier the way the Bot API formats them:
/// `-100…` is a channel, other negatives are basic groups, positives are
/// raw channel ids.
fn split_numeric_id(id: i64) -> NumericPeer {
    if id <= -CHANNEL_ID_OFFSET {
        NumericPeer::Channel(-id - CHANNEL_ID_OFFSET)
    } else if id < 0 {
        NumericPeer::Chat(-id)
    } else {
        NumericPeer::Channel(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flood_wait_seconds() {
        assert_eq!(flood_wait_seconds("FLOOD_WAIT", Some(120)), Some(120));
        assert_eq!(flood_wait_seconds("FLOOD_PREMIUM_WAIT", Some(5)), Some(5));
        assert_eq!(flood_wait_seconds("CHANNEL_PRIVATE", None), None);
        assert_eq!(flood_wait_seconds("MESSAGE_ID_INVALID", Some(3)), None);
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("@news"), "news");
        assert_eq!(normalize_username("news"), "news");
        assert_eq!(normalize_username("https://t.me/news/"), "news");
        assert_eq!(normalize_username(" t.me/news "), "news");
    }

    #[test]
    fn test_split_numeric_id() {
        assert_eq!(
            split_numeric_id(-1_001_234_567_890),
            NumericPeer::Channel(1_234_567_890)
        );
        assert_eq!(split_numeric_id(-4242), NumericPeer::Chat(4242));
        assert_eq!(split_numeric_id(1_234_567_890), NumericPeer::Channel(1_234_567_890));
    }

    #[test]
    fn test_message_ref_skips_empty() {
        let empty = tl::enums::Message::Empty(tl::types::MessageEmpty {
            id: 7,
            peer_id: None,
        });
        assert_eq!(message_ref(&empty), None);
        assert_eq!(message_id(&empty), 7);
    }

    #[test]
    fn test_page_of_empty_slots_keeps_paging() {
        let page: Vec<tl::enums::Message> = [250, 120, 180]
            .into_iter()
            .map(|id| tl::enums::Message::Empty(tl::types::MessageEmpty { id, peer_id: None }))
            .collect();

        assert_eq!(next_offset(&page), Some(120));
        assert!(page.iter().filter_map(message_ref).next().is_none());
        assert_eq!(next_offset(&[]), None);
    }
}
