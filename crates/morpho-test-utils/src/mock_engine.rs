// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock swap engine for deterministic testing.
//!
//! `MockSwapEngine` implements `SwapEngine` with pre-scripted outcomes,
//! enabling fast, CI-runnable tests without an inference service.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use morpho_core::{
    AdapterType, HealthStatus, MorphoError, PluginAdapter, SwapEngine, SwapError, TargetSelector,
};

/// A scripted outcome for one swap call.
pub enum ScriptedSwap {
    Succeed(Vec<u8>),
    NoFace,
    Unavailable,
    TimeOut,
}

/// A mock swap engine that pops scripted outcomes from a FIFO queue.
///
/// When the script is empty, calls succeed with a fixed `b"swapped"` image.
/// Every call's target selector is recorded for assertions.
pub struct MockSwapEngine {
    script: Arc<Mutex<VecDeque<ScriptedSwap>>>,
    calls: Arc<Mutex<Vec<TargetSelector>>>,
    delay: Option<Duration>,
}

impl MockSwapEngine {
    /// Create a mock engine with an empty script (every call succeeds).
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Create a mock engine pre-loaded with outcomes.
    pub fn with_script(outcomes: Vec<ScriptedSwap>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(outcomes))),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Adds an artificial latency to every call, for concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Appends an outcome to the script.
    pub async fn push_outcome(&self, outcome: ScriptedSwap) {
        self.script.lock().await.push_back(outcome);
    }

    /// Target selectors of all calls made so far, in order.
    pub async fn recorded_targets(&self) -> Vec<TargetSelector> {
        self.calls.lock().await.clone()
    }

    /// Number of swap calls made so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockSwapEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSwapEngine {
    fn name(&self) -> &str {
        "mock-swap"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Inference
    }

    async fn health_check(&self) -> Result<HealthStatus, MorphoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MorphoError> {
        Ok(())
    }
}

#[async_trait]
impl SwapEngine for MockSwapEngine {
    async fn swap(&self, _source: &[u8], target: &TargetSelector) -> Result<Vec<u8>, SwapError> {
        self.calls.lock().await.push(target.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.script.lock().await.pop_front();
        match outcome {
            None => Ok(b"swapped".to_vec()),
            Some(ScriptedSwap::Succeed(image)) => Ok(image),
            Some(ScriptedSwap::NoFace) => Err(SwapError::NoFaceDetected),
            Some(ScriptedSwap::Unavailable) => Err(SwapError::ServiceUnavailable {
                message: "mock outage".into(),
            }),
            Some(ScriptedSwap::TimeOut) => Err(SwapError::Timeout {
                duration: Duration::from_secs(20),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn target() -> TargetSelector {
        TargetSelector::Catalog {
            filepath: PathBuf::from("/t/mona.png"),
            mode: "mona_lisa".into(),
        }
    }

    #[tokio::test]
    async fn empty_script_succeeds_with_default_image() {
        let engine = MockSwapEngine::new();
        let result = engine.swap(b"src", &target()).await.unwrap();
        assert_eq!(result, b"swapped");
        assert_eq!(engine.call_count().await, 1);
    }

    #[tokio::test]
    async fn scripted_outcomes_pop_in_order() {
        let engine = MockSwapEngine::with_script(vec![
            ScriptedSwap::Succeed(b"first".to_vec()),
            ScriptedSwap::NoFace,
            ScriptedSwap::Unavailable,
        ]);

        assert_eq!(engine.swap(b"s", &target()).await.unwrap(), b"first");
        assert!(matches!(
            engine.swap(b"s", &target()).await.unwrap_err(),
            SwapError::NoFaceDetected
        ));
        assert!(matches!(
            engine.swap(b"s", &target()).await.unwrap_err(),
            SwapError::ServiceUnavailable { .. }
        ));
        // Script exhausted: back to the default success.
        assert_eq!(engine.swap(b"s", &target()).await.unwrap(), b"swapped");
    }

    #[tokio::test]
    async fn targets_are_recorded() {
        let engine = MockSwapEngine::new();
        engine.swap(b"s", &target()).await.unwrap();
        let custom = TargetSelector::Custom {
            filepath: PathBuf::from("/uploads/u1.png"),
        };
        engine.swap(b"s", &custom).await.unwrap();

        let recorded = engine.recorded_targets().await;
        assert_eq!(recorded.len(), 2);
        assert!(matches!(recorded[0], TargetSelector::Catalog { .. }));
        assert!(matches!(recorded[1], TargetSelector::Custom { .. }));
    }
}
