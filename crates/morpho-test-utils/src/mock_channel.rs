// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound updates
//! and captured outbound replies for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use morpho_core::types::{
    ChannelCapabilities, InboundUpdate, MessageId, OutboundReply,
};
use morpho_core::{AdapterType, ChannelAdapter, HealthStatus, MorphoError, PluginAdapter};

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: Updates injected via `inject_update()` are returned by `receive()`
/// - **sent**: Replies passed to `send()` are captured and retrievable via `sent_replies()`
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundUpdate>>>,
    sent: Arc<Mutex<Vec<OutboundReply>>>,
    notify: Arc<Notify>,
    sent_notify: Arc<Notify>,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            sent_notify: Arc::new(Notify::new()),
        }
    }

    /// Inject an inbound update into the receive queue.
    pub async fn inject_update(&self, update: InboundUpdate) {
        self.inbound.lock().await.push_back(update);
        self.notify.notify_one();
    }

    /// All replies sent through `send()` so far.
    pub async fn sent_replies(&self) -> Vec<OutboundReply> {
        self.sent.lock().await.clone()
    }

    /// Number of replies sent so far.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clears the captured replies.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Waits until at least `count` replies have been sent.
    ///
    /// Panics after ten seconds; in a healthy test the wait is milliseconds.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<OutboundReply> {
        let deadline = tokio::time::Duration::from_secs(10);
        tokio::time::timeout(deadline, async {
            loop {
                {
                    let sent = self.sent.lock().await;
                    if sent.len() >= count {
                        return sent.clone();
                    }
                }
                self.sent_notify.notified().await;
            }
        })
        .await
        .expect("timed out waiting for replies")
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, MorphoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MorphoError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_photos: true,
            max_message_length: None,
        }
    }

    async fn connect(&mut self) -> Result<(), MorphoError> {
        Ok(())
    }

    async fn send(&self, reply: OutboundReply) -> Result<MessageId, MorphoError> {
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(reply);
        // notify_one stores a permit, so a send landing between the
        // waiter's length check and its notified().await is never lost.
        self.sent_notify.notify_one();
        Ok(MessageId(id))
    }

    async fn receive(&self) -> Result<InboundUpdate, MorphoError> {
        loop {
            // Try to pop from queue
            {
                let mut queue = self.inbound.lock().await;
                if let Some(update) = queue.pop_front() {
                    return Ok(update);
                }
            }
            // Wait for notification that a new update was injected
            self.notify.notified().await;
        }
    }

    async fn notify_processing(&self, _chat_id: &str) -> Result<(), MorphoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::photo_update;
    use morpho_core::types::ReplyBody;

    #[tokio::test]
    async fn receive_returns_injected_updates_in_order() {
        let channel = MockChannel::new();
        channel.inject_update(photo_update("u1", b"first")).await;
        channel.inject_update(photo_update("u1", b"second")).await;

        let first = channel.receive().await.unwrap();
        let second = channel.receive().await.unwrap();
        match (&first.payload, &second.payload) {
            (
                morpho_core::types::InboundPayload::Photo { data: d1, .. },
                morpho_core::types::InboundPayload::Photo { data: d2, .. },
            ) => {
                assert_eq!(d1, b"first");
                assert_eq!(d2, b"second");
            }
            _ => panic!("expected photo payloads"),
        }
    }

    #[tokio::test]
    async fn send_captures_replies() {
        let channel = MockChannel::new();
        let reply = OutboundReply {
            chat_id: "c1".into(),
            body: ReplyBody::Text("hello".into()),
        };

        let id = channel.send(reply).await.unwrap();
        assert!(id.0.starts_with("mock-msg-"));

        let sent = channel.sent_replies().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "c1");
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let channel = Arc::new(MockChannel::new());
        let injector = channel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
            injector.inject_update(photo_update("u1", b"delayed")).await;
        });

        let received = tokio::time::timeout(
            tokio::time::Duration::from_secs(2),
            channel.receive(),
        )
        .await
        .expect("receive timed out")
        .unwrap();
        assert_eq!(received.user_id, "u1");
    }

    #[tokio::test]
    async fn wait_for_sent_blocks_until_reply_arrives() {
        let channel = Arc::new(MockChannel::new());
        let sender = channel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(30)).await;
            sender
                .send(OutboundReply {
                    chat_id: "c1".into(),
                    body: ReplyBody::Text("late".into()),
                })
                .await
                .unwrap();
        });

        let sent = channel.wait_for_sent(1).await;
        assert_eq!(sent.len(), 1);
    }
}
