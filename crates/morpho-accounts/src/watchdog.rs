// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background sweep that force-releases expired reservations.
//!
//! A worker that crashes between reserve and commit would otherwise leave
//! its user pending forever. The watchdog bounds that window to the
//! configured reservation lifetime.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::AccountStore;

/// Spawns the reservation watchdog.
///
/// Sweeps the store every `interval` until `cancel` fires.
pub fn spawn_watchdog(
    store: Arc<AccountStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            max_lifetime_secs = store.policy().reservation_max_lifetime.as_secs(),
            "reservation watchdog started"
        );
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let released = store.force_release_expired();
                    if released > 0 {
                        warn!(released, "watchdog force-released stuck reservations");
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("reservation watchdog stopped");
                    break;
                }
            }
        }
    })
}
