// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the agent loop monitors. In-flight swap
//! requests are drained before the process exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
/// The signal handler task runs in the background until the token is cancelled.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits for in-flight swap requests to finish, up to `timeout`.
///
/// Every running request holds one permit of the in-flight semaphore, so
/// holding all `max_inflight` permits means the workers are done. Requests
/// still queued for a permit at shutdown are abandoned; their reservations
/// fall to the watchdog.
pub async fn drain_inflight(inflight: &Arc<Semaphore>, max_inflight: usize, timeout: Duration) {
    let all = u32::try_from(max_inflight).unwrap_or(u32::MAX);
    match tokio::time::timeout(timeout, inflight.acquire_many(all)).await {
        Ok(Ok(_permits)) => {
            info!("all in-flight requests drained");
        }
        Ok(Err(_)) => {
            debug!("in-flight semaphore closed during drain");
        }
        Err(_) => {
            warn!(
                available = inflight.available_permits(),
                max_inflight, "drain timeout reached, some requests interrupted"
            );
        }
    }
}
