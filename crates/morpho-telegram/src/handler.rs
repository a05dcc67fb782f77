// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message classification and content extraction.
//!
//! Parses incoming Telegram messages into the channel-agnostic
//! [`InboundUpdate`]: commands, photo submissions, plain text, or
//! unsupported content. No business logic lives here.

use morpho_core::MorphoError;
use morpho_core::types::{Command, InboundPayload, InboundUpdate};
use teloxide::prelude::*;
use teloxide::types::ChatKind;
use tracing::debug;

use crate::media;

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Parses a text message into a bot command.
///
/// Returns `None` for text that is not a recognized command. A trailing
/// `@BotName` on the command word is tolerated.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let name = head
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or_default();

    match (name, arg) {
        ("start", _) => Some(Command::Start),
        ("menu", _) => Some(Command::Menu),
        ("status", _) => Some(Command::Status),
        ("help", _) => Some(Command::Help),
        ("buy_premium", _) => Some(Command::BuyPremium),
        ("target", _) => Some(Command::ArmCustomTarget),
        ("select", Some(category)) => Some(Command::SelectCategory(category.to_lowercase())),
        ("pick", Some(mode)) => Some(Command::SelectTarget(mode.to_string())),
        _ => None,
    }
}

/// Extracts the payload from a Telegram message.
///
/// Photos are downloaded at their largest available size. Anything that is
/// neither text nor a photo becomes [`InboundPayload::Unsupported`].
pub async fn extract_payload(bot: &Bot, msg: &Message) -> Result<InboundPayload, MorphoError> {
    if let Some(text) = msg.text() {
        return Ok(match parse_command(text) {
            Some(command) => InboundPayload::Command(command),
            None => InboundPayload::Text(text.to_string()),
        });
    }

    if let Some(photos) = msg.photo() {
        let data = media::download_largest_photo(bot, photos).await?;
        return Ok(InboundPayload::Photo {
            data,
            caption: msg.caption().map(|s| s.to_string()),
        });
    }

    debug!(msg_id = msg.id.0, "unsupported message type");
    Ok(InboundPayload::Unsupported)
}

/// Converts a Telegram message and extracted payload into an [`InboundUpdate`].
pub fn to_inbound_update(msg: &Message, payload: InboundPayload) -> InboundUpdate {
    let user_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    InboundUpdate {
        id: msg.id.0.to_string(),
        user_id,
        chat_id: msg.chat.id.0.to_string(),
        payload,
        timestamp: chrono::DateTime::to_rfc3339(&msg.date),
    }
}
