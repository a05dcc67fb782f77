// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Morpho face-swap bot.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling in, text and photo replies out. Deliberately thin -- all
//! business logic lives behind the channel trait, in the orchestrator.

pub mod handler;
pub mod media;

use async_trait::async_trait;
use morpho_config::model::TelegramConfig;
use morpho_core::types::{
    ChannelCapabilities, InboundUpdate, MessageId, OutboundReply, ReplyBody,
};
use morpho_core::{AdapterType, ChannelAdapter, HealthStatus, MorphoError, PluginAdapter};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, InputFile, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Telegram channel adapter implementing [`ChannelAdapter`].
///
/// Connects via long polling, accepts photos and commands from private
/// chats, and delivers text or photo replies.
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundUpdate>>,
    inbound_tx: mpsc::Sender<InboundUpdate>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, MorphoError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            MorphoError::Config("telegram.bot_token is required for the Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(MorphoError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, MorphoError> {
        // Check if the bot token is valid by calling getMe.
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), MorphoError> {
        debug!("Telegram channel shutting down");
        // The polling handle is dropped with the channel, which aborts the
        // task. For graceful shutdown, the agent loop stops calling
        // receive() first.
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_photos: true,
            max_message_length: Some(4096),
        }
    }

    async fn connect(&mut self) -> Result<(), MorphoError> {
        if self.polling_handle.is_some() {
            return Ok(()); // Already connected
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let message_handler =
                Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                    let tx = tx.clone();
                    async move {
                        // Filter: DMs only
                        if !handler::is_dm(&msg) {
                            debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
                            return respond(());
                        }

                        match handler::extract_payload(&bot, &msg).await {
                            Ok(payload) => {
                                let update = handler::to_inbound_update(&msg, payload);
                                if tx.send(update).await.is_err() {
                                    warn!("inbound channel closed, dropping message");
                                }
                            }
                            Err(e) => {
                                error!(error = %e, "failed to extract message content");
                            }
                        }

                        respond(())
                    }
                });

            Dispatcher::builder(bot, message_handler)
                .default_handler(|_| async {}) // Silently ignore non-message updates
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, reply: OutboundReply) -> Result<MessageId, MorphoError> {
        let chat_id = parse_chat_id(&reply.chat_id)?;

        let sent = match reply.body {
            ReplyBody::Text(text) => self
                .bot
                .send_message(Recipient::Id(chat_id), text)
                .await
                .map_err(|e| MorphoError::Channel {
                    message: format!("failed to send message: {e}"),
                    source: Some(Box::new(e)),
                })?,
            ReplyBody::Photo { data, caption } => {
                let mut request = self
                    .bot
                    .send_photo(Recipient::Id(chat_id), InputFile::memory(data));
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await.map_err(|e| MorphoError::Channel {
                    message: format!("failed to send photo: {e}"),
                    source: Some(Box::new(e)),
                })?
            }
        };

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<InboundUpdate, MorphoError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| MorphoError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn notify_processing(&self, chat_id: &str) -> Result<(), MorphoError> {
        let chat_id = parse_chat_id(chat_id)?;
        self.bot
            .send_chat_action(chat_id, ChatAction::UploadPhoto)
            .await
            .map_err(|e| MorphoError::Channel {
                message: format!("failed to send chat action: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

/// Parses the channel-agnostic chat id into a Telegram ChatId.
fn parse_chat_id(chat_id: &str) -> Result<ChatId, MorphoError> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|e| MorphoError::Channel {
            message: format!("invalid chat_id `{chat_id}`: {e}"),
            source: None,
        })
}
