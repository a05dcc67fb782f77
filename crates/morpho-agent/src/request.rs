// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request state machine for one photo submission.
//!
//! Success path: Received -> QuotaChecked -> TargetResolved -> Swapped ->
//! Committed. Every abort releases the reservation and carries a
//! [`RejectReason`]; the account is charged exactly when the outcome is
//! success, and the charge is durable before the outcome is returned.

use std::path::Path;

use morpho_accounts::{AccountError, AccountStore};
use morpho_catalog::Catalog;
use morpho_core::{RejectReason, SwapEngine, SwapError, SwapOutcome, TargetSelector, Tier};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// States of the swap request FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Inbound photo accepted for processing.
    Received,
    /// Reservation held, quota gate passed.
    QuotaChecked,
    /// Target face resolved from the catalog or the custom target.
    TargetResolved,
    /// Inference returned a result image.
    Swapped,
    /// Terminal: outcome delivered-ready, quota decremented on success.
    Committed,
    /// Terminal: outcome delivered-ready, quota untouched.
    Aborted,
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestState::Received => write!(f, "received"),
            RequestState::QuotaChecked => write!(f, "quota_checked"),
            RequestState::TargetResolved => write!(f, "target_resolved"),
            RequestState::Swapped => write!(f, "swapped"),
            RequestState::Committed => write!(f, "committed"),
            RequestState::Aborted => write!(f, "aborted"),
        }
    }
}

/// Tracks one request's progress through the FSM, for tracing.
struct RequestFsm {
    user_id: String,
    state: RequestState,
}

impl RequestFsm {
    fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            state: RequestState::Received,
        }
    }

    fn transition(&mut self, next: RequestState) {
        debug!(
            user_id = %self.user_id,
            from = %self.state,
            to = %next,
            "swap request transition"
        );
        self.state = next;
    }
}

/// Drives one photo submission through reserve -> resolve -> swap -> commit.
///
/// The reservation is taken before waiting on the global in-flight permit,
/// so a duplicate submission is rejected immediately instead of queued.
/// Holds no lock besides the per-user reservation, and the reservation is
/// released on every path out of this function.
pub async fn run_swap(
    accounts: &AccountStore,
    catalog: &Catalog,
    engine: &dyn SwapEngine,
    inflight: &Semaphore,
    user_id: &str,
    source: &[u8],
) -> SwapOutcome {
    let mut fsm = RequestFsm::new(user_id);

    // Step 1+2: load-or-create the account and reserve the quota slot.
    let (token, account) = match accounts.check_and_reserve(user_id).await {
        Ok(reserved) => reserved,
        Err(AccountError::QuotaExceeded) => {
            fsm.transition(RequestState::Aborted);
            return SwapOutcome::Rejected(RejectReason::QuotaExceeded);
        }
        Err(AccountError::RequestAlreadyInProgress) => {
            fsm.transition(RequestState::Aborted);
            return SwapOutcome::Rejected(RejectReason::RequestAlreadyInProgress);
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "reservation failed");
            fsm.transition(RequestState::Aborted);
            return SwapOutcome::Rejected(RejectReason::ServiceUnavailable);
        }
    };
    fsm.transition(RequestState::QuotaChecked);

    // Gate on the global concurrency ceiling. The semaphore is never
    // closed during normal operation; a closed semaphore means shutdown.
    let Ok(_permit) = inflight.acquire().await else {
        abort_uncharged(accounts, token, &mut fsm).await;
        return SwapOutcome::Rejected(RejectReason::ServiceUnavailable);
    };

    // Step 3: resolve the target. Premium custom target takes precedence;
    // otherwise the selected category is required.
    let target = if account.tier == Tier::Premium
        && let Some(ref custom) = account.custom_target_path
    {
        TargetSelector::Custom {
            filepath: custom.into(),
        }
    } else {
        let Some(ref category) = account.selected_category else {
            abort_uncharged(accounts, token, &mut fsm).await;
            return SwapOutcome::Rejected(RejectReason::NoCategorySelected);
        };
        match catalog.resolve_target(category, account.selected_mode.as_deref()) {
            Ok(target) => TargetSelector::Catalog {
                filepath: target.filepath.clone(),
                mode: target.mode.clone(),
            },
            Err(e) => {
                // The account points at catalog data that no longer exists.
                // Data inconsistency, not user error: never silently fall
                // back to a default category.
                warn!(
                    user_id = %user_id,
                    category = %category,
                    error = %e,
                    "target resolution failed mid-request"
                );
                abort_uncharged(accounts, token, &mut fsm).await;
                return SwapOutcome::Rejected(RejectReason::TargetUnavailable);
            }
        }
    };
    fsm.transition(RequestState::TargetResolved);

    // Step 4: the inference call. The only long-blocking step; runs under
    // the client's own timeout, holding nothing but the reservation.
    let image = match engine.swap(source, &target).await {
        Ok(image) => image,
        Err(SwapError::NoFaceDetected) => {
            abort_uncharged(accounts, token, &mut fsm).await;
            return SwapOutcome::Rejected(RejectReason::NoFaceDetected);
        }
        Err(e @ (SwapError::ServiceUnavailable { .. } | SwapError::Timeout { .. })) => {
            warn!(user_id = %user_id, error = %e, "transient inference failure");
            abort_uncharged(accounts, token, &mut fsm).await;
            return SwapOutcome::Rejected(RejectReason::ServiceUnavailable);
        }
        Err(e @ SwapError::Protocol { .. }) => {
            error!(user_id = %user_id, error = %e, "inference protocol error");
            abort_uncharged(accounts, token, &mut fsm).await;
            return SwapOutcome::Rejected(RejectReason::ServiceUnavailable);
        }
    };
    fsm.transition(RequestState::Swapped);

    // Step 5: commit. The decrement is durable before the success outcome
    // exists; if the charge cannot be written, the result must not be
    // delivered either.
    if let Err(e) = accounts.commit(token, true).await {
        error!(user_id = %user_id, error = %e, "commit failed, withholding result");
        fsm.transition(RequestState::Aborted);
        return SwapOutcome::Rejected(RejectReason::ServiceUnavailable);
    }
    fsm.transition(RequestState::Committed);

    SwapOutcome::Success { image }
}

/// Releases the reservation without charging and marks the FSM aborted.
async fn abort_uncharged(
    accounts: &AccountStore,
    token: morpho_accounts::ReservationToken,
    fsm: &mut RequestFsm,
) {
    if let Err(e) = accounts.commit(token, false).await {
        warn!(error = %e, "failed to release reservation cleanly");
    }
    fsm.transition(RequestState::Aborted);
}

/// Stores a premium user's uploaded photo as their custom target.
///
/// Writes the bytes under `custom_targets_dir` keyed by user id, then
/// records the path and disarms the awaiting flag.
pub async fn store_custom_target_photo(
    accounts: &AccountStore,
    custom_targets_dir: &Path,
    user_id: &str,
    data: &[u8],
) -> Result<(), AccountError> {
    tokio::fs::create_dir_all(custom_targets_dir)
        .await
        .map_err(|e| {
            AccountError::Storage(morpho_core::MorphoError::Storage {
                source: Box::new(e),
            })
        })?;

    let path = custom_targets_dir.join(format!("{user_id}.png"));
    tokio::fs::write(&path, data).await.map_err(|e| {
        AccountError::Storage(morpho_core::MorphoError::Storage {
            source: Box::new(e),
        })
    })?;

    accounts
        .store_custom_target(user_id, &path.to_string_lossy())
        .await?;
    debug!(user_id = %user_id, path = %path.display(), "custom target stored");
    Ok(())
}
