// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Morpho boundary components.

pub mod accounts;
pub mod adapter;
pub mod channel;
pub mod swap;

pub use accounts::AccountsAdapter;
pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use swap::SwapEngine;
