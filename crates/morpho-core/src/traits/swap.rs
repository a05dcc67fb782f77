// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference capability trait for the external face-swap service.

use async_trait::async_trait;

use crate::error::SwapError;
use crate::traits::adapter::PluginAdapter;
use crate::types::TargetSelector;

/// Capability handle for the face-swap inference service.
///
/// One call is one swap: source image in, result image out, or a classified
/// [`SwapError`]. The engine behind this trait (model, weights, serving
/// process) is fully swappable without touching orchestration logic.
#[async_trait]
pub trait SwapEngine: PluginAdapter {
    /// Swaps the face in `source` onto the target identified by `target`.
    ///
    /// Implementations must apply a bounded timeout and classify failures:
    /// a service that answered but found no face is a different outcome
    /// from a service that could not be reached.
    async fn swap(&self, source: &[u8], target: &TargetSelector) -> Result<Vec<u8>, SwapError>;
}
