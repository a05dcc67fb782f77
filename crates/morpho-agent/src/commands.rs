// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command handling: everything a user can do besides sending a photo.
//!
//! Commands are fast account/catalog operations handled inline by the agent
//! loop; only photo submissions spawn worker tasks.

use morpho_accounts::{AccountError, AccountStore};
use morpho_catalog::Catalog;
use morpho_core::types::{Command, InboundUpdate, OutboundReply, ReplyBody};
use morpho_core::{ChannelAdapter, MorphoError, RejectReason, Tier};
use tracing::warn;

const HELP_TEXT: &str = "Send me a photo and I'll swap the face onto your chosen target.\n\
/menu -- list target categories\n\
/select <category> -- choose a category\n\
/pick <target> -- choose a target within it\n\
/status -- your tier and remaining swaps\n\
/buy_premium -- unlock custom targets and more swaps\n\
/target -- premium: upload your own target photo\n\
/help -- this message";

/// Handles one parsed command, replying through the channel.
pub async fn handle_command(
    channel: &dyn ChannelAdapter,
    accounts: &AccountStore,
    catalog: &Catalog,
    premium_bonus: i64,
    update: &InboundUpdate,
    command: &Command,
) -> Result<(), MorphoError> {
    let user_id = update.user_id.as_str();
    let chat_id = update.chat_id.as_str();

    match command {
        Command::Start => {
            let account = accounts.get_or_create(user_id).await?;
            send_text(
                channel,
                chat_id,
                &format!(
                    "Hey! Send me a photo and I'll swap the face onto a target of \
                     your choice. You have {} swaps.",
                    account.quota_remaining
                ),
            )
            .await?;
            send_text(channel, chat_id, &menu_text(catalog)).await?;
        }

        Command::Menu => {
            send_text(channel, chat_id, &menu_text(catalog)).await?;
        }

        Command::SelectCategory(name) => match catalog.get_category(name) {
            Ok(category) => {
                accounts.set_category(user_id, &category.name).await?;
                let caption = format!(
                    "Selected `{}`.\n{}\nOr just send a photo to use the first one.",
                    category.name,
                    targets_text(catalog, &category.name)
                );
                match tokio::fs::read(&category.collage_path).await {
                    Ok(collage) => {
                        channel
                            .send(OutboundReply {
                                chat_id: chat_id.to_string(),
                                body: ReplyBody::Photo {
                                    data: collage,
                                    caption: Some(caption),
                                },
                            })
                            .await?;
                    }
                    Err(e) => {
                        // Collage files are validated at catalog load; a read
                        // failure here means the file vanished since.
                        warn!(
                            path = %category.collage_path.display(),
                            error = %e,
                            "collage unreadable, replying with text only"
                        );
                        send_text(channel, chat_id, &caption).await?;
                    }
                }
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "category selection failed");
                send_text(
                    channel,
                    chat_id,
                    &format!("No category named `{name}`. Send /menu to see the list."),
                )
                .await?;
            }
        },

        Command::SelectTarget(mode) => {
            let account = accounts.get_or_create(user_id).await?;
            let Some(category) = account.selected_category else {
                send_text(
                    channel,
                    chat_id,
                    RejectReason::NoCategorySelected.user_message(),
                )
                .await?;
                return Ok(());
            };
            match catalog.resolve_target(&category, Some(mode)) {
                Ok(target) => {
                    accounts.set_mode(user_id, &target.mode).await?;
                    send_text(
                        channel,
                        chat_id,
                        &format!("Target set: {}. Send me a photo!", target.name),
                    )
                    .await?;
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "target selection failed");
                    send_text(
                        channel,
                        chat_id,
                        &format!("No target `{mode}` in `{category}`. Send /select {category} to see them."),
                    )
                    .await?;
                }
            }
        }

        Command::Status => {
            let account = accounts.get_or_create(user_id).await?;
            let mut status = format!(
                "Tier: {}\nSwaps left: {}\nCategory: {}\nTarget: {}",
                account.tier,
                account.quota_remaining,
                account.selected_category.as_deref().unwrap_or("(none)"),
                account.selected_mode.as_deref().unwrap_or("(first in category)"),
            );
            if account.tier == Tier::Premium {
                status.push_str(&format!(
                    "\nCustom target: {}",
                    if account.custom_target_path.is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                ));
            }
            send_text(channel, chat_id, &status).await?;
        }

        Command::BuyPremium => {
            // Payment processing lives outside the bot; this applies the
            // entitlement. Repeat purchases are additive, never an error.
            let account = accounts.upgrade_to_premium(user_id, premium_bonus).await?;
            send_text(
                channel,
                chat_id,
                &format!(
                    "You're premium now! Added {premium_bonus} swaps -- you have {}. \
                     Upload your own target with /target.",
                    account.quota_remaining
                ),
            )
            .await?;
        }

        Command::ArmCustomTarget => match accounts.arm_custom_target(user_id).await {
            Ok(()) => {
                send_text(
                    channel,
                    chat_id,
                    "Send me the target photo now. Your next photo upload becomes the target.",
                )
                .await?;
            }
            Err(AccountError::NotPremium) => {
                send_text(channel, chat_id, RejectReason::NotPremium.user_message()).await?;
            }
            Err(AccountError::Storage(e)) => return Err(e),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "unexpected arm-target failure");
            }
        },

        Command::Help => {
            send_text(channel, chat_id, HELP_TEXT).await?;
        }
    }

    Ok(())
}

/// The category menu, in catalog order.
fn menu_text(catalog: &Catalog) -> String {
    let mut text = String::from("Categories:\n");
    for (name, _collage) in catalog.list_categories() {
        text.push_str(&format!("  {name} -- /select {name}\n"));
    }
    text.push_str("Pick one, then send me a photo.");
    text
}

/// The target listing for one category.
fn targets_text(catalog: &Catalog, category_name: &str) -> String {
    let mut text = String::from("Targets:\n");
    if let Ok(category) = catalog.get_category(category_name) {
        for target in &category.targets {
            text.push_str(&format!("  {} -- /pick {}\n", target.name, target.mode));
        }
    }
    text
}

/// Sends a plain text reply.
pub async fn send_text(
    channel: &dyn ChannelAdapter,
    chat_id: &str,
    text: &str,
) -> Result<(), MorphoError> {
    channel
        .send(OutboundReply {
            chat_id: chat_id.to_string(),
            body: ReplyBody::Text(text.to_string()),
        })
        .await?;
    Ok(())
}
