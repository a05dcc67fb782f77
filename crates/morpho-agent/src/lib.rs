// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request orchestration for the Morpho face-swap bot.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives updates from the channel adapter
//! - Handles commands inline (account and catalog operations are fast)
//! - Spawns one bounded worker task per photo submission
//! - Enforces the reserve/commit quota protocol via the account store
//! - Discards (but never abandons) requests superseded by a newer command
//! - Handles graceful shutdown

pub mod commands;
pub mod request;
pub mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use morpho_accounts::AccountStore;
use morpho_catalog::Catalog;
use morpho_config::model::MorphoConfig;
use morpho_core::types::{InboundPayload, InboundUpdate, OutboundReply, ReplyBody};
use morpho_core::{ChannelAdapter, MorphoError, RejectReason, SwapEngine, SwapOutcome, Tier};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const USAGE_HINT: &str =
    "I only understand photos and commands. Send a photo to swap, or /help for the commands.";

/// The main agent loop coordinating channel, account store, catalog, and
/// inference engine.
pub struct AgentLoop {
    channel: Arc<dyn ChannelAdapter>,
    accounts: Arc<AccountStore>,
    catalog: Arc<Catalog>,
    engine: Arc<dyn SwapEngine>,
    config: MorphoConfig,
    /// Global ceiling on concurrent swap requests.
    inflight: Arc<Semaphore>,
    /// Per-user tokens for discarding superseded deliveries.
    supersede: Arc<DashMap<String, CancellationToken>>,
}

impl AgentLoop {
    /// Creates a new agent loop. The channel must already be connected.
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        accounts: Arc<AccountStore>,
        catalog: Arc<Catalog>,
        engine: Arc<dyn SwapEngine>,
        config: MorphoConfig,
    ) -> Self {
        let inflight = Arc::new(Semaphore::new(config.agent.max_inflight));
        info!(
            bot_name = config.agent.name.as_str(),
            max_inflight = config.agent.max_inflight,
            categories = catalog.len(),
            "agent loop initialized"
        );
        Self {
            channel,
            accounts,
            catalog,
            engine,
            config,
            inflight,
            supersede: Arc::new(DashMap::new()),
        }
    }

    /// Runs the main loop until the cancellation token is triggered.
    ///
    /// The loop:
    /// 1. Waits for inbound updates from the channel
    /// 2. Handles commands inline, spawns a worker per photo
    /// 3. On cancellation, drains in-flight requests before exiting
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MorphoError> {
        info!("agent loop running");

        loop {
            tokio::select! {
                update = self.channel.receive() => {
                    match update {
                        Ok(update) => self.dispatch(update).await,
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            // If the channel is closed, break out of the loop.
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        shutdown::drain_inflight(
            &self.inflight,
            self.config.agent.max_inflight,
            Duration::from_secs(30),
        )
        .await;

        info!("agent loop stopped");
        Ok(())
    }

    /// Routes one inbound update.
    async fn dispatch(&self, update: InboundUpdate) {
        debug!(
            update_id = update.id.as_str(),
            user_id = update.user_id.as_str(),
            "handling inbound update"
        );

        match update.payload {
            InboundPayload::Command(ref command) => {
                // A fresh command supersedes the delivery of any in-flight
                // swap for this user. The reservation still runs to
                // completion; only the result is discarded.
                if let Some(entry) = self.supersede.get(&update.user_id) {
                    entry.value().cancel();
                }

                let result = commands::handle_command(
                    self.channel.as_ref(),
                    self.accounts.as_ref(),
                    self.catalog.as_ref(),
                    self.config.quota.premium_bonus,
                    &update,
                    command,
                )
                .await;
                if let Err(e) = result {
                    error!(user_id = %update.user_id, error = %e, "command handling failed");
                    let _ = commands::send_text(
                        self.channel.as_ref(),
                        &update.chat_id,
                        RejectReason::ServiceUnavailable.user_message(),
                    )
                    .await;
                }
            }

            InboundPayload::Photo { data, .. } => {
                self.spawn_photo_worker(update.user_id, update.chat_id, data);
            }

            InboundPayload::Text(_) | InboundPayload::Unsupported => {
                let _ =
                    commands::send_text(self.channel.as_ref(), &update.chat_id, USAGE_HINT).await;
            }
        }
    }

    /// Spawns the worker task for one photo submission.
    fn spawn_photo_worker(&self, user_id: String, chat_id: String, data: Vec<u8>) {
        let channel = Arc::clone(&self.channel);
        let accounts = Arc::clone(&self.accounts);
        let catalog = Arc::clone(&self.catalog);
        let engine = Arc::clone(&self.engine);
        let inflight = Arc::clone(&self.inflight);
        let custom_targets_dir = PathBuf::from(&self.config.catalog.custom_targets_dir);

        let cancel = CancellationToken::new();
        self.supersede.insert(user_id.clone(), cancel.clone());

        tokio::spawn(async move {
            // Premium custom-target upload short-circuits the swap flow.
            match accounts.get_or_create(&user_id).await {
                Ok(account) if account.awaiting_target && account.tier == Tier::Premium => {
                    let reply = match request::store_custom_target_photo(
                        &accounts,
                        &custom_targets_dir,
                        &user_id,
                        &data,
                    )
                    .await
                    {
                        Ok(()) => {
                            "Custom target saved. Every photo you send now uses it.".to_string()
                        }
                        Err(e) => {
                            error!(user_id = %user_id, error = %e, "custom target upload failed");
                            RejectReason::ServiceUnavailable.user_message().to_string()
                        }
                    };
                    let _ = commands::send_text(channel.as_ref(), &chat_id, &reply).await;
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "account lookup failed");
                    let _ = commands::send_text(
                        channel.as_ref(),
                        &chat_id,
                        RejectReason::ServiceUnavailable.user_message(),
                    )
                    .await;
                    return;
                }
            }

            let _ = channel.notify_processing(&chat_id).await;

            let outcome = request::run_swap(
                &accounts,
                &catalog,
                engine.as_ref(),
                &inflight,
                &user_id,
                &data,
            )
            .await;

            // Superseded: the reservation ran to completion above (no
            // account is ever left pending), but the result is discarded.
            if cancel.is_cancelled() {
                info!(user_id = %user_id, "discarding result of superseded request");
                return;
            }

            match outcome {
                SwapOutcome::Success { image } => {
                    let caption = match accounts.get_or_create(&user_id).await {
                        Ok(account) => {
                            Some(format!("Here you go! {} swaps left.", account.quota_remaining))
                        }
                        Err(_) => None,
                    };
                    let reply = OutboundReply {
                        chat_id: chat_id.clone(),
                        body: ReplyBody::Photo {
                            data: image,
                            caption,
                        },
                    };
                    if let Err(e) = channel.send(reply).await {
                        error!(user_id = %user_id, error = %e, "failed to deliver result image");
                    }
                }
                SwapOutcome::Rejected(reason) => {
                    debug!(user_id = %user_id, reason = %reason, "swap rejected");
                    let _ =
                        commands::send_text(channel.as_ref(), &chat_id, reason.user_message())
                            .await;
                }
            }
        });
    }
}
