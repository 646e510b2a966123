use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use tokio::sync::mpsc;

use super::hub::MarkerHub;
use super::{ChannelId, ChatPlatform, Marker, MarkerEvent, MessageRef, PlatformError};

const MARKERS_PER_ROW: usize = 5;

/// Telegram backend for the chat platform port.
///
/// Train channels are forum topics of the community's supergroup. Vote
/// markers are inline-keyboard buttons; taps come back as callback queries,
/// which the callback handler feeds into the shared [`MarkerHub`].
pub struct TelegramPlatform {
    bot: Bot,
    hub: Arc<MarkerHub>,
}

impl TelegramPlatform {
    pub fn new(bot: Bot, hub: Arc<MarkerHub>) -> Self {
        Self { bot, hub }
    }

    fn keyboard(message: &MessageRef, markers: &[Marker]) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = markers
            .chunks(MARKERS_PER_ROW)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|marker| {
                        InlineKeyboardButton::callback(
                            marker.as_str(),
                            format!("vote:{}:{}", message.id_string(), marker),
                        )
                    })
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn create_channel(
        &self,
        guild_id: i64,
        name: &str,
    ) -> Result<ChannelId, PlatformError> {
        let topic = self
            .bot
            .create_forum_topic(ChatId(guild_id), name, 0x6FB9F0, String::new())
            .await
            .map_err(|e| PlatformError::Api(e.to_string()))?;
        Ok(ChannelId {
            chat: guild_id,
            topic: i64::from(topic.message_thread_id),
        })
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageRef, PlatformError> {
        let mut request = self
            .bot
            .send_message(ChatId(channel.chat), text)
            .parse_mode(ParseMode::MarkdownV2);
        if channel.topic != 0 {
            request = request.message_thread_id(channel.topic as i32);
        }
        let sent = request
            .await
            .map_err(|e| PlatformError::Api(e.to_string()))?;
        Ok(MessageRef {
            channel,
            message: i64::from(sent.id.0),
        })
    }

    async fn attach_markers(
        &self,
        message: &MessageRef,
        markers: &[Marker],
    ) -> Result<(), PlatformError> {
        self.bot
            .edit_message_reply_markup(
                ChatId(message.channel.chat),
                MessageId(message.message as i32),
            )
            .reply_markup(Self::keyboard(message, markers))
            .await
            .map_err(|e| PlatformError::Api(e.to_string()))?;
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), PlatformError> {
        self.bot
            .delete_message(
                ChatId(message.channel.chat),
                MessageId(message.message as i32),
            )
            .await
            .map_err(|e| PlatformError::Api(e.to_string()))?;
        Ok(())
    }

    async fn subscribe_markers(
        &self,
        message: &MessageRef,
    ) -> Result<mpsc::Receiver<MarkerEvent>, PlatformError> {
        Ok(self.hub.subscribe(message))
    }
}
