// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The account store: quota gating, per-user reservations, and the commit
//! protocol over the durable accounts adapter.
//!
//! Invariant: a quota decrement and the successful swap it pays for commit
//! atomically from the requester's point of view. The decrement is written
//! durably before the success outcome is reported, a failed swap never
//! charges, and the SQL guard plus the per-user reservation keep the
//! counter from ever going negative.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use morpho_config::model::QuotaConfig;
use morpho_core::{AccountsAdapter, MorphoError, Tier, UserAccount};
use thiserror::Error;
use tracing::{debug, warn};

use crate::reservation::{PendingReservation, ReservationToken};

/// Semantic failures from account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The account has no swaps left (and its tier enforces a ceiling).
    #[error("quota exhausted")]
    QuotaExceeded,

    /// One reservation per user at a time; the second concurrent request
    /// is rejected immediately, never queued.
    #[error("a request is already in progress for this user")]
    RequestAlreadyInProgress,

    /// A premium-only operation was attempted by a free account.
    #[error("premium entitlement required")]
    NotPremium,

    /// Underlying storage failure.
    #[error(transparent)]
    Storage(#[from] MorphoError),
}

/// Quota and entitlement policy, resolved from configuration once.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    /// Swaps a fresh account starts with.
    pub starter_quota: i64,
    /// Swaps added per premium purchase.
    pub premium_bonus: i64,
    /// `None` = premium accounts are never quota-blocked.
    pub premium_ceiling: Option<i64>,
    /// Reservations older than this are force-released by the watchdog.
    pub reservation_max_lifetime: Duration,
}

impl QuotaPolicy {
    pub fn from_config(config: &QuotaConfig) -> Self {
        Self {
            starter_quota: config.starter_quota,
            premium_bonus: config.premium_bonus,
            premium_ceiling: config.premium_ceiling,
            reservation_max_lifetime: Duration::from_secs(config.reservation_max_secs),
        }
    }
}

/// Per-user account state with atomic reserve/commit semantics.
///
/// The pending map is the only in-memory mutable state; everything durable
/// lives behind the [`AccountsAdapter`]. Calls for distinct users never
/// contend beyond a dashmap shard lock.
pub struct AccountStore {
    storage: Arc<dyn AccountsAdapter>,
    pending: DashMap<String, PendingReservation>,
    policy: QuotaPolicy,
}

impl AccountStore {
    pub fn new(storage: Arc<dyn AccountsAdapter>, policy: QuotaPolicy) -> Self {
        Self {
            storage,
            pending: DashMap::new(),
            policy,
        }
    }

    /// The resolved quota policy.
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Fetches the account, creating it with the starter quota on first
    /// contact. Idempotent: concurrent first contact resolves to one row.
    pub async fn get_or_create(&self, user_id: &str) -> Result<UserAccount, MorphoError> {
        if let Some(account) = self.storage.get_account(user_id).await? {
            return Ok(account);
        }

        let now = now_rfc3339();
        let fresh = UserAccount {
            user_id: user_id.to_string(),
            quota_remaining: self.policy.starter_quota,
            tier: Tier::Free,
            selected_category: None,
            selected_mode: None,
            custom_target_path: None,
            awaiting_target: false,
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.insert_account(&fresh).await?;
        debug!(user_id = %user_id, "account created");

        // Re-read: a concurrent creator may have won the insert race.
        self.storage
            .get_account(user_id)
            .await?
            .ok_or_else(|| MorphoError::Internal(format!("account `{user_id}` vanished after insert")))
    }

    /// Reserves the user's quota slot for one swap request.
    ///
    /// Atomic with respect to concurrent calls for the same user: exactly
    /// one caller gets the token, the rest get
    /// [`AccountError::RequestAlreadyInProgress`]. Reserving does not
    /// decrement; the charge happens at [`commit`](Self::commit).
    pub async fn check_and_reserve(
        &self,
        user_id: &str,
    ) -> Result<(ReservationToken, UserAccount), AccountError> {
        let account = self.get_or_create(user_id).await?;

        // Compare-and-set on the pending entry. Taking the slot before the
        // quota gate means the quota read below cannot race a concurrent
        // commit for the same user.
        let token = match self.pending.entry(user_id.to_string()) {
            Entry::Occupied(_) => return Err(AccountError::RequestAlreadyInProgress),
            Entry::Vacant(vacant) => {
                let token = ReservationToken::new(user_id);
                vacant.insert(PendingReservation {
                    token_id: token.id().to_string(),
                    reserved_at: Instant::now(),
                });
                token
            }
        };

        if self.quota_blocked(&account) {
            self.release(&token);
            return Err(AccountError::QuotaExceeded);
        }

        debug!(user_id = %user_id, reservation = %token.id(), "quota slot reserved");
        Ok((token, account))
    }

    /// Whether the account's tier and counter block a new request.
    fn quota_blocked(&self, account: &UserAccount) -> bool {
        match account.tier {
            Tier::Free => account.quota_remaining <= 0,
            // Premium is only blocked when a ceiling is configured.
            Tier::Premium => {
                self.policy.premium_ceiling.is_some() && account.quota_remaining <= 0
            }
        }
    }

    /// Commits the outcome of a reserved request and releases the slot.
    ///
    /// On success the quota is durably decremented before this returns, so
    /// the caller may deliver the result afterwards. On failure nothing is
    /// charged. Consuming the token guarantees exactly one release per
    /// reservation; a commit whose reservation was already reaped by the
    /// watchdog still charges on success (the user received the image) and
    /// logs the stale release.
    pub async fn commit(&self, token: ReservationToken, success: bool) -> Result<(), AccountError> {
        let charge_result = if success {
            match self.storage.decrement_quota(token.user_id()).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    // Unlimited-premium accounts sit at zero and are never
                    // charged below it; for anyone else the reservation
                    // gate makes this unreachable.
                    debug!(
                        user_id = %token.user_id(),
                        "quota already at zero, no charge applied"
                    );
                    Ok(())
                }
                Err(e) => Err(AccountError::from(e)),
            }
        } else {
            Ok(())
        };

        self.release(&token);
        charge_result
    }

    /// Removes the pending entry belonging to `token`.
    fn release(&self, token: &ReservationToken) {
        let removed = self
            .pending
            .remove_if(token.user_id(), |_, pending| pending.token_id == token.id());
        if removed.is_none() {
            warn!(
                user_id = %token.user_id(),
                reservation = %token.id(),
                "reservation was already released (watchdog expiry?)"
            );
        }
    }

    /// Force-releases reservations older than the configured maximum
    /// lifetime. Returns the number released. Called by the watchdog so a
    /// crashed worker can never leave an account pending forever.
    pub fn force_release_expired(&self) -> usize {
        let max_lifetime = self.policy.reservation_max_lifetime;
        let mut released = 0usize;
        self.pending.retain(|user_id, pending| {
            let expired = pending.reserved_at.elapsed() > max_lifetime;
            if expired {
                warn!(
                    user_id = %user_id,
                    held_for_secs = pending.reserved_at.elapsed().as_secs(),
                    "force-releasing expired reservation"
                );
                released += 1;
            }
            !expired
        });
        released
    }

    /// Whether the user currently holds a reservation.
    pub fn has_pending(&self, user_id: &str) -> bool {
        self.pending.contains_key(user_id)
    }

    /// Number of reservations currently held across all users.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Selects a category for the user.
    pub async fn set_category(&self, user_id: &str, category: &str) -> Result<(), MorphoError> {
        self.get_or_create(user_id).await?;
        self.storage.set_category(user_id, category).await
    }

    /// Selects a target mode within the user's current category.
    pub async fn set_mode(&self, user_id: &str, mode: &str) -> Result<(), MorphoError> {
        self.get_or_create(user_id).await?;
        self.storage.set_mode(user_id, mode).await
    }

    /// Applies the premium entitlement, adding `bonus_quota`. Repeat
    /// purchases are additive, never an error.
    pub async fn upgrade_to_premium(
        &self,
        user_id: &str,
        bonus_quota: i64,
    ) -> Result<UserAccount, MorphoError> {
        self.get_or_create(user_id).await?;
        self.storage.upgrade_to_premium(user_id, bonus_quota).await?;
        self.get_or_create(user_id).await
    }

    /// Arms the "next photo is a custom target" flag. Premium only.
    pub async fn arm_custom_target(&self, user_id: &str) -> Result<(), AccountError> {
        let account = self.get_or_create(user_id).await?;
        if account.tier != Tier::Premium {
            return Err(AccountError::NotPremium);
        }
        self.storage.set_awaiting_target(user_id, true).await?;
        Ok(())
    }

    /// Stores an uploaded custom target and disarms the flag. Premium only.
    pub async fn store_custom_target(&self, user_id: &str, path: &str) -> Result<(), AccountError> {
        let account = self.get_or_create(user_id).await?;
        if account.tier != Tier::Premium {
            return Err(AccountError::NotPremium);
        }
        self.storage.set_custom_target(user_id, path).await?;
        self.storage.set_awaiting_target(user_id, false).await?;
        Ok(())
    }

    /// Administrative quota reset to the starter value.
    pub async fn reset_quota(&self, user_id: &str) -> Result<UserAccount, MorphoError> {
        self.get_or_create(user_id).await?;
        self.storage
            .set_quota(user_id, self.policy.starter_quota)
            .await?;
        self.get_or_create(user_id).await
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use morpho_config::model::StorageConfig;
    use morpho_storage::SqliteAccounts;
    use tempfile::tempdir;

    async fn test_store(policy: QuotaPolicy) -> (Arc<AccountStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("accounts.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = SqliteAccounts::new(config);
        storage.initialize().await.unwrap();
        let store = AccountStore::new(Arc::new(storage), policy);
        (Arc::new(store), dir)
    }

    fn default_policy() -> QuotaPolicy {
        QuotaPolicy {
            starter_quota: 10,
            premium_bonus: 100,
            premium_ceiling: None,
            reservation_max_lifetime: Duration::from_secs(120),
        }
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (store, _dir) = test_store(default_policy()).await;

        let first = store.get_or_create("u1").await.unwrap();
        assert_eq!(first.quota_remaining, 10);
        assert_eq!(first.tier, Tier::Free);

        let second = store.get_or_create("u1").await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn success_commit_charges_failure_commit_does_not() {
        let (store, _dir) = test_store(default_policy()).await;

        let (token, account) = store.check_and_reserve("u1").await.unwrap();
        assert_eq!(account.quota_remaining, 10);
        store.commit(token, true).await.unwrap();
        assert_eq!(store.get_or_create("u1").await.unwrap().quota_remaining, 9);

        let (token, _) = store.check_and_reserve("u1").await.unwrap();
        store.commit(token, false).await.unwrap();
        assert_eq!(store.get_or_create("u1").await.unwrap().quota_remaining, 9);
    }

    #[tokio::test]
    async fn free_user_exhausts_quota() {
        let (store, _dir) = test_store(QuotaPolicy {
            starter_quota: 1,
            ..default_policy()
        })
        .await;

        let (token, _) = store.check_and_reserve("u1").await.unwrap();
        store.commit(token, true).await.unwrap();
        assert_eq!(store.get_or_create("u1").await.unwrap().quota_remaining, 0);

        let err = store.check_and_reserve("u1").await.unwrap_err();
        assert!(matches!(err, AccountError::QuotaExceeded));
        // A rejected reserve must not leave a pending entry behind.
        assert!(!store.has_pending("u1"));
    }

    #[tokio::test]
    async fn second_reservation_is_rejected_while_pending() {
        let (store, _dir) = test_store(default_policy()).await;

        let (token, _) = store.check_and_reserve("u1").await.unwrap();
        let err = store.check_and_reserve("u1").await.unwrap_err();
        assert!(matches!(err, AccountError::RequestAlreadyInProgress));

        // Distinct users never contend.
        let (other, _) = store.check_and_reserve("u2").await.unwrap();
        store.commit(other, false).await.unwrap();

        store.commit(token, false).await.unwrap();
        assert!(store.check_and_reserve("u1").await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_exactly_one_proceeds() {
        let (store, _dir) = test_store(default_policy()).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.check_and_reserve("u1").await.map(|(token, _)| token)
            }));
        }

        let mut granted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_token) => granted += 1,
                Err(AccountError::RequestAlreadyInProgress) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(granted, 1, "exactly one concurrent reservation may win");
        assert_eq!(rejected, 7);
    }

    #[tokio::test]
    async fn expired_reservation_is_force_released() {
        let (store, _dir) = test_store(QuotaPolicy {
            reservation_max_lifetime: Duration::from_millis(20),
            ..default_policy()
        })
        .await;

        let (token, _) = store.check_and_reserve("u1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.force_release_expired(), 1);
        assert!(!store.has_pending("u1"));

        // The user can submit again.
        let (fresh, _) = store.check_and_reserve("u1").await.unwrap();

        // A late commit with the reaped token still charges but must not
        // release the successor's reservation.
        store.commit(token, true).await.unwrap();
        assert!(store.has_pending("u1"));
        store.commit(fresh, false).await.unwrap();
        assert!(!store.has_pending("u1"));
    }

    #[tokio::test]
    async fn fresh_reservations_survive_the_sweep() {
        let (store, _dir) = test_store(default_policy()).await;
        let (token, _) = store.check_and_reserve("u1").await.unwrap();

        assert_eq!(store.force_release_expired(), 0);
        assert!(store.has_pending("u1"));
        store.commit(token, false).await.unwrap();
    }

    #[tokio::test]
    async fn premium_gate_and_additive_upgrade() {
        let (store, _dir) = test_store(default_policy()).await;
        store.get_or_create("u1").await.unwrap();

        let err = store.arm_custom_target("u1").await.unwrap_err();
        assert!(matches!(err, AccountError::NotPremium));
        let err = store.store_custom_target("u1", "/t/u1.png").await.unwrap_err();
        assert!(matches!(err, AccountError::NotPremium));

        let account = store.upgrade_to_premium("u1", 100).await.unwrap();
        assert_eq!(account.tier, Tier::Premium);
        assert_eq!(account.quota_remaining, 110);

        store.arm_custom_target("u1").await.unwrap();
        assert!(store.get_or_create("u1").await.unwrap().awaiting_target);

        store.store_custom_target("u1", "/t/u1.png").await.unwrap();
        let account = store.get_or_create("u1").await.unwrap();
        assert!(!account.awaiting_target);
        assert_eq!(account.custom_target_path.as_deref(), Some("/t/u1.png"));

        // Repeat purchase is additive, not an error.
        let account = store.upgrade_to_premium("u1", 100).await.unwrap();
        assert_eq!(account.quota_remaining, 210);
    }

    #[tokio::test]
    async fn unlimited_premium_is_never_blocked() {
        let (store, _dir) = test_store(QuotaPolicy {
            starter_quota: 0,
            premium_ceiling: None,
            ..default_policy()
        })
        .await;

        store.get_or_create("u1").await.unwrap();
        store.upgrade_to_premium("u1", 0).await.unwrap();

        // Zero quota, premium, no ceiling: still allowed, never negative.
        let (token, _) = store.check_and_reserve("u1").await.unwrap();
        store.commit(token, true).await.unwrap();
        assert_eq!(store.get_or_create("u1").await.unwrap().quota_remaining, 0);
    }

    #[tokio::test]
    async fn premium_with_ceiling_is_blocked_at_zero() {
        let (store, _dir) = test_store(QuotaPolicy {
            starter_quota: 0,
            premium_ceiling: Some(500),
            ..default_policy()
        })
        .await;

        store.get_or_create("u1").await.unwrap();
        store.upgrade_to_premium("u1", 1).await.unwrap();

        let (token, _) = store.check_and_reserve("u1").await.unwrap();
        store.commit(token, true).await.unwrap();

        let err = store.check_and_reserve("u1").await.unwrap_err();
        assert!(matches!(err, AccountError::QuotaExceeded));
    }

    #[tokio::test]
    async fn reset_quota_restores_starter_value() {
        let (store, _dir) = test_store(QuotaPolicy {
            starter_quota: 3,
            ..default_policy()
        })
        .await;

        for _ in 0..3 {
            let (token, _) = store.check_and_reserve("u1").await.unwrap();
            store.commit(token, true).await.unwrap();
        }
        assert!(matches!(
            store.check_and_reserve("u1").await.unwrap_err(),
            AccountError::QuotaExceeded
        ));

        let account = store.reset_quota("u1").await.unwrap();
        assert_eq!(account.quota_remaining, 3);
        assert!(store.check_and_reserve("u1").await.is_ok());
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]

        /// For any sequence of success/failure outcomes, the quota never
        /// goes negative and drops by exactly one per success (until the
        /// free-tier gate kicks in).
        #[test]
        fn quota_is_monotone_and_never_negative(outcomes in proptest::collection::vec(proptest::bool::ANY, 0..24)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let (store, _dir) = test_store(QuotaPolicy {
                    starter_quota: 5,
                    ..default_policy()
                })
                .await;

                let mut expected: i64 = 5;
                for &success in &outcomes {
                    match store.check_and_reserve("u1").await {
                        Ok((token, _)) => {
                            store.commit(token, success).await.unwrap();
                            if success {
                                expected -= 1;
                            }
                        }
                        Err(AccountError::QuotaExceeded) => {
                            assert_eq!(expected, 0);
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                    let account = store.get_or_create("u1").await.unwrap();
                    assert!(account.quota_remaining >= 0);
                    assert_eq!(account.quota_remaining, expected.max(0));
                }
            });
        }
    }
}
