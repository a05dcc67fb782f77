// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persisted user accounts.
//!
//! These are durable row operations only. Reservation semantics (pending
//! flags, quota gating, the commit protocol) live above this trait, in the
//! account store.

use async_trait::async_trait;

use crate::error::MorphoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::UserAccount;

/// Adapter for the persisted account store.
///
/// All mutations must be durably committed when the call returns: the
/// orchestrator reports a success outcome to the user only after the
/// corresponding quota decrement has been written.
#[async_trait]
pub trait AccountsAdapter: PluginAdapter {
    /// Initializes the backend (connection, migrations).
    async fn initialize(&self) -> Result<(), MorphoError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), MorphoError>;

    /// Fetches an account by user id.
    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>, MorphoError>;

    /// Inserts an account if absent; existing rows are left untouched.
    async fn insert_account(&self, account: &UserAccount) -> Result<(), MorphoError>;

    /// Durably decrements `quota_remaining` by one.
    ///
    /// Returns `false` (without mutating) if the quota was already zero,
    /// so the counter can never go negative regardless of caller bugs.
    async fn decrement_quota(&self, user_id: &str) -> Result<bool, MorphoError>;

    /// Sets the tier to premium and adds `bonus_quota`, in one write.
    /// Re-application adds the bonus again (repeat purchases are additive).
    async fn upgrade_to_premium(&self, user_id: &str, bonus_quota: i64)
        -> Result<(), MorphoError>;

    /// Sets the selected category and clears the selected mode (the old
    /// mode is meaningless in the new category).
    async fn set_category(&self, user_id: &str, category: &str) -> Result<(), MorphoError>;

    /// Sets the selected target mode within the current category.
    async fn set_mode(&self, user_id: &str, mode: &str) -> Result<(), MorphoError>;

    /// Stores the path of an uploaded custom target image.
    async fn set_custom_target(&self, user_id: &str, path: &str) -> Result<(), MorphoError>;

    /// Arms or disarms the "next photo is a custom target" flag.
    async fn set_awaiting_target(&self, user_id: &str, awaiting: bool)
        -> Result<(), MorphoError>;

    /// Overwrites the remaining quota (administrative reset).
    async fn set_quota(&self, user_id: &str, quota: i64) -> Result<(), MorphoError>;
}
