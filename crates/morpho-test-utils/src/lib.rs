// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Morpho integration tests: mock adapters and fixtures
//! that make the orchestration layer testable without Telegram, an
//! inference service, or a persistent database.

pub mod fixtures;
pub mod mock_channel;
pub mod mock_engine;

pub use fixtures::{command_update, photo_update, sample_catalog, temp_account_store, test_policy};
pub use mock_channel::MockChannel;
pub use mock_engine::{MockSwapEngine, ScriptedSwap};
