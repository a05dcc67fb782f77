// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the messaging front-end (Telegram, mocks).

use async_trait::async_trait;

use crate::error::MorphoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundUpdate, MessageId, OutboundReply};

/// Adapter for the bidirectional messaging channel.
///
/// The channel is a thin I/O wrapper: it converts platform messages into
/// [`InboundUpdate`]s and delivers [`OutboundReply`]s. All business logic
/// lives behind this seam, in the orchestrator.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes the connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), MorphoError>;

    /// Delivers a reply through the channel.
    async fn send(&self, reply: OutboundReply) -> Result<MessageId, MorphoError>;

    /// Receives the next inbound update from the channel.
    async fn receive(&self) -> Result<InboundUpdate, MorphoError>;

    /// Signals the user that their submission is being processed
    /// (e.g. Telegram's "uploading a photo" chat action). Best effort.
    async fn notify_processing(&self, chat_id: &str) -> Result<(), MorphoError>;
}
