// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Morpho face-swap bot.
//!
//! All writes go through a single tokio-rusqlite background thread; WAL
//! mode keeps readers unblocked. Schema changes ship as embedded refinery
//! migrations applied on open.

pub mod adapter;
pub mod database;
pub mod queries;

pub use adapter::SqliteAccounts;
pub use database::Database;
