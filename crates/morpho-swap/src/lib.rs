// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Face-swap inference adapter for the Morpho bot.
//!
//! Implements [`SwapEngine`] over HTTP against the external swap service.
//! The engine behind the endpoint (model, weights, execution provider) is
//! opaque to this crate and fully swappable.

pub mod client;

use async_trait::async_trait;
use morpho_core::{
    AdapterType, HealthStatus, MorphoError, PluginAdapter, SwapEngine, SwapError, TargetSelector,
};

pub use client::SwapClient;

#[async_trait]
impl PluginAdapter for SwapClient {
    fn name(&self) -> &str {
        "http-swap"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Inference
    }

    async fn health_check(&self) -> Result<HealthStatus, MorphoError> {
        match self.probe().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(reason) => Ok(HealthStatus::Unhealthy(reason)),
        }
    }

    async fn shutdown(&self) -> Result<(), MorphoError> {
        Ok(())
    }
}

#[async_trait]
impl SwapEngine for SwapClient {
    async fn swap(&self, source: &[u8], target: &TargetSelector) -> Result<Vec<u8>, SwapError> {
        self.swap_request(source, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morpho_config::model::InferenceConfig;

    #[test]
    fn adapter_metadata() {
        let client = SwapClient::new(&InferenceConfig::default()).unwrap();
        assert_eq!(client.name(), "http-swap");
        assert_eq!(client.version(), semver::Version::new(0, 1, 0));
        assert_eq!(client.adapter_type(), AdapterType::Inference);
    }

    #[tokio::test]
    async fn health_check_reports_unreachable_service() {
        let client = SwapClient::new(&InferenceConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            max_retries: 0,
        })
        .unwrap();
        let status = client.health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Unhealthy(_)));
    }
}
