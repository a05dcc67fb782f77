// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Morpho workspace.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a delivered channel message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind the [`PluginAdapter`](crate::PluginAdapter) base trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Channel,
    Inference,
    Storage,
}

/// Entitlement tier of a user account.
///
/// Premium unlocks custom-target upload and a configurable (possibly
/// unlimited) quota ceiling. Stored in SQLite as its lowercase string form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

/// A persisted user account record.
///
/// Created on first interaction, mutated on every quota-consuming action and
/// on tier/category/target changes, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Opaque stable identifier (the channel's user id rendered as text).
    pub user_id: String,
    /// Remaining successful swaps. Never negative.
    pub quota_remaining: i64,
    pub tier: Tier,
    /// Category the user last selected; `None` until a selection is made.
    pub selected_category: Option<String>,
    /// Target discriminator the user last picked within the category.
    /// `None` means "first target of the category".
    pub selected_mode: Option<String>,
    /// Path of a user-supplied target image. Premium only.
    pub custom_target_path: Option<String>,
    /// When set, the user's next photo upload is stored as a custom target
    /// instead of being swapped. Premium only.
    pub awaiting_target: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last mutation.
    pub updated_at: String,
}

/// User-facing reasons a swap request was not fulfilled.
///
/// This is the closed taxonomy of recoverable outcomes; each maps to a fixed
/// reply. Infrastructure faults surface as [`ServiceUnavailable`](Self::ServiceUnavailable)
/// or [`TargetUnavailable`](Self::TargetUnavailable) with the detail kept in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RejectReason {
    /// Out of quota; recoverable by purchasing premium.
    QuotaExceeded,
    /// No category selected yet; recoverable via the category menu.
    NoCategorySelected,
    /// Another submission from the same user is still being processed.
    RequestAlreadyInProgress,
    /// The inference service found no face in the image. Never charged.
    NoFaceDetected,
    /// The inference service is unreachable, overloaded, or timed out.
    /// Never charged; the user may retry later.
    ServiceUnavailable,
    /// A premium-only action was attempted by a free account.
    NotPremium,
    /// The account points at a category or target the catalog no longer
    /// has. Data inconsistency, reported generically.
    TargetUnavailable,
}

impl RejectReason {
    /// Fixed reply text delivered to the user for this outcome.
    pub fn user_message(&self) -> &'static str {
        match self {
            RejectReason::QuotaExceeded => {
                "You are out of swaps. Use /buy_premium to keep going."
            }
            RejectReason::NoCategorySelected => {
                "Pick a category first -- send /menu to see what's available."
            }
            RejectReason::RequestAlreadyInProgress => {
                "Your previous photo is still processing. Give it a moment."
            }
            RejectReason::NoFaceDetected => {
                "No face found in that photo. Try another one -- you were not charged."
            }
            RejectReason::ServiceUnavailable => {
                "The swap service is having a moment. Try again shortly -- you were not charged."
            }
            RejectReason::NotPremium => {
                "That's a premium feature. Use /buy_premium to unlock it."
            }
            RejectReason::TargetUnavailable => {
                "Something went wrong with your selected target. Pick another via /menu."
            }
        }
    }
}

/// Final outcome of one swap request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The swapped image, ready for delivery. The account was charged.
    Success { image: Vec<u8> },
    /// The request was aborted. The account was not charged.
    Rejected(RejectReason),
}

/// Selects the target face handed to the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// A catalog target, identified by its image file and validated mode.
    Catalog { filepath: PathBuf, mode: String },
    /// A premium user's own uploaded target image.
    Custom { filepath: PathBuf },
}

impl TargetSelector {
    /// Path of the target image file on durable storage.
    pub fn filepath(&self) -> &std::path::Path {
        match self {
            TargetSelector::Catalog { filepath, .. } => filepath,
            TargetSelector::Custom { filepath } => filepath,
        }
    }
}

/// Commands a user can issue through the chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// First contact: create the account and greet.
    Start,
    /// Show the category menu.
    Menu,
    /// Report tier, remaining quota, and current selection.
    Status,
    /// Command summary.
    Help,
    /// Apply the premium entitlement (additive, repeatable).
    BuyPremium,
    /// Premium: treat the next photo as a custom target upload.
    ArmCustomTarget,
    /// Select a category by name.
    SelectCategory(String),
    /// Pick a target within the selected category by its mode.
    SelectTarget(String),
}

/// What an inbound channel update carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    Command(Command),
    /// A photo submission (the swap hot path, or a custom-target upload).
    Photo {
        data: Vec<u8>,
        caption: Option<String>,
    },
    /// Free-form text that is not a recognized command.
    Text(String),
    /// Stickers, voice, documents, polls -- anything the bot does not handle.
    Unsupported,
}

/// A channel-agnostic inbound update delivered to the orchestrator.
#[derive(Debug, Clone)]
pub struct InboundUpdate {
    /// Channel-scoped update identifier (for logging).
    pub id: String,
    /// Opaque stable user identifier.
    pub user_id: String,
    /// Where replies for this update go.
    pub chat_id: String,
    pub payload: InboundPayload,
    /// RFC 3339 timestamp from the channel.
    pub timestamp: String,
}

/// Body of an outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Text(String),
    Photo {
        data: Vec<u8>,
        caption: Option<String>,
    },
}

/// A channel-agnostic outbound reply produced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub chat_id: String,
    pub body: ReplyBody,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    /// Whether the channel can deliver photo replies.
    pub supports_photos: bool,
    /// Maximum text message length, if the channel imposes one.
    pub max_message_length: Option<usize>,
}
