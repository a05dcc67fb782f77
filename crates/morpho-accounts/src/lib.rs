// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account semantics for the Morpho face-swap bot.
//!
//! Sits between the orchestrator and the durable accounts adapter:
//! idempotent account creation, the atomic reserve/commit protocol that
//! makes quota charging linearizable per user, entitlement gates, and the
//! watchdog that reaps abandoned reservations.

pub mod reservation;
pub mod store;
pub mod watchdog;

pub use reservation::ReservationToken;
pub use store::{AccountError, AccountStore, QuotaPolicy};
pub use watchdog::spawn_watchdog;
