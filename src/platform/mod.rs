//! Chat platform port.
//!
//! The train core talks to the chat platform through [`ChatPlatform`], a
//! narrow interface: send a message, attach vote markers, delete a message,
//! and subscribe to marker events on a message. The production backend is
//! Telegram ([`telegram::TelegramPlatform`]); tests use an in-process mock.

pub mod hub;
pub mod telegram;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;

/// A channel a train can post into: a chat plus a forum topic within it.
/// Topic `0` is the chat's main message stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub chat: i64,
    pub topic: i64,
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chat, self.topic)
    }
}

impl FromStr for ChannelId {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chat, topic) = s
            .split_once('.')
            .ok_or_else(|| PlatformError::Malformed(s.to_string()))?;
        let chat = chat
            .parse()
            .map_err(|_| PlatformError::Malformed(s.to_string()))?;
        let topic = topic
            .parse()
            .map_err(|_| PlatformError::Malformed(s.to_string()))?;
        Ok(ChannelId { chat, topic })
    }
}

/// Composite reference to a posted message, rendered `<channel_id>/<message_id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel: ChannelId,
    pub message: i64,
}

impl MessageRef {
    /// The composite id string used in callback data and storage.
    pub fn id_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.message)
    }
}

impl FromStr for MessageRef {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (channel, message) = s
            .split_once('/')
            .ok_or_else(|| PlatformError::Malformed(s.to_string()))?;
        let channel = channel.parse()?;
        let message = message
            .parse()
            .map_err(|_| PlatformError::Malformed(s.to_string()))?;
        Ok(MessageRef { channel, message })
    }
}

/// A reaction symbol a participant taps to record a choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker(pub String);

impl Marker {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Marker {
    fn from(s: &str) -> Self {
        Marker(s.to_string())
    }
}

/// One participant tapping one marker.
#[derive(Debug, Clone)]
pub struct MarkerEvent {
    pub marker: Marker,
    pub user_id: i64,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("chat API error: {0}")]
    Api(String),
    #[error("malformed channel or message reference: {0}")]
    Malformed(String),
}

/// The messaging operations the train core consumes.
///
/// `delete_message` may fail; callers treat deletion as best-effort.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Create a dedicated channel for a train inside `guild_id`.
    async fn create_channel(&self, guild_id: i64, name: &str)
        -> Result<ChannelId, PlatformError>;

    /// Post `text` into `channel` and return a reference to the new message.
    async fn send_message(&self, channel: ChannelId, text: &str)
        -> Result<MessageRef, PlatformError>;

    /// Attach the given vote markers to an existing message.
    async fn attach_markers(
        &self,
        message: &MessageRef,
        markers: &[Marker],
    ) -> Result<(), PlatformError>;

    /// Delete a previously posted message.
    async fn delete_message(&self, message: &MessageRef) -> Result<(), PlatformError>;

    /// Subscribe to marker events on a message. Events arrive until the
    /// receiver is dropped.
    async fn subscribe_markers(
        &self,
        message: &MessageRef,
    ) -> Result<mpsc::Receiver<MarkerEvent>, PlatformError>;
}
