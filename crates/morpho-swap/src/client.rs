// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the face-swap inference service.
//!
//! One call is one swap: the source photo and the resolved target image are
//! posted as a multipart body; the service answers with the result image
//! (base64 in JSON) or a structured error. The client applies a bounded
//! timeout, retries transient statuses once, and classifies every failure
//! so the orchestrator can decide charge vs. no-charge.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use morpho_config::model::InferenceConfig;
use morpho_core::{MorphoError, SwapError, TargetSelector};
use serde::Deserialize;
use tracing::{debug, warn};

/// Delay before the single transient-error retry.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Successful response body. Parsed defensively: the external schema may
/// grow fields, and some deployments report errors inside a 200 body.
#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

/// Error response body.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    kind: String,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the swap service.
///
/// Stateless between calls; safe to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SwapClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl SwapClient {
    /// Creates a new swap client from the inference configuration.
    pub fn new(config: &InferenceConfig) -> Result<Self, MorphoError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MorphoError::Inference {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: config.max_retries,
        })
    }

    /// The configured per-request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs one swap call, with a single retry on transient statuses.
    pub(crate) async fn swap_request(
        &self,
        source: &[u8],
        target: &TargetSelector,
    ) -> Result<Vec<u8>, SwapError> {
        let target_bytes =
            tokio::fs::read(target.filepath())
                .await
                .map_err(|e| SwapError::Protocol {
                    message: format!(
                        "cannot read target image `{}`: {e}",
                        target.filepath().display()
                    ),
                })?;

        let url = format!("{}/swap", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying swap request after transient error");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }

            // multipart::Form is not Clone, so each attempt rebuilds it.
            let mut form = reqwest::multipart::Form::new()
                .part(
                    "source",
                    reqwest::multipart::Part::bytes(source.to_vec()).file_name("source.jpg"),
                )
                .part(
                    "target",
                    reqwest::multipart::Part::bytes(target_bytes.clone())
                        .file_name("target.png"),
                );
            if let TargetSelector::Catalog { mode, .. } = target {
                form = form.text("mode", mode.clone());
            }

            let response = self
                .client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| self.classify_send_error(e))?;

            let status = response.status();
            debug!(status = %status, attempt, "swap response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| SwapError::Protocol {
                    message: format!("failed to read response body: {e}"),
                })?;
                return parse_success_body(&body);
            }

            let body = response.text().await.unwrap_or_default();

            // A structured no-face error maps to its own outcome regardless
            // of status code, and is never retried.
            if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body)
                && api_err.error.kind == "no_face"
            {
                return Err(SwapError::NoFaceDetected);
            }

            if is_transient_status(status) {
                let message = format!("service returned {status}: {body}");
                if attempt < self.max_retries {
                    warn!(status = %status, "transient error, will retry");
                    last_error = Some(SwapError::ServiceUnavailable { message });
                    continue;
                }
                return Err(SwapError::ServiceUnavailable { message });
            }

            return Err(SwapError::Protocol {
                message: format!("service returned {status}: {body}"),
            });
        }

        Err(last_error.unwrap_or_else(|| SwapError::ServiceUnavailable {
            message: "swap request failed after retries".into(),
        }))
    }

    /// Classifies a reqwest send error: deadline vs. connectivity.
    fn classify_send_error(&self, e: reqwest::Error) -> SwapError {
        if e.is_timeout() {
            SwapError::Timeout {
                duration: self.timeout,
            }
        } else {
            SwapError::ServiceUnavailable {
                message: format!("request failed: {e}"),
            }
        }
    }

    /// Probes the service's health endpoint.
    pub(crate) async fn probe(&self) -> Result<(), String> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(format!("health endpoint returned {}", response.status())),
            Err(e) => Err(format!("swap service unreachable: {e}")),
        }
    }
}

/// Overrides the base URL (for testing with wiremock).
#[cfg(test)]
impl SwapClient {
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

fn parse_success_body(body: &str) -> Result<Vec<u8>, SwapError> {
    let parsed: SwapResponse = serde_json::from_str(body).map_err(|e| SwapError::Protocol {
        message: format!("unparseable response body: {e}"),
    })?;

    if let Some(error) = parsed.error {
        if error.kind == "no_face" {
            return Err(SwapError::NoFaceDetected);
        }
        return Err(SwapError::Protocol {
            message: format!(
                "service reported `{}`: {}",
                error.kind,
                error.message.unwrap_or_default()
            ),
        });
    }

    let image = parsed.image.ok_or_else(|| SwapError::Protocol {
        message: "response carries neither image nor error".into(),
    })?;

    BASE64.decode(image).map_err(|e| SwapError::Protocol {
        message: format!("result image is not valid base64: {e}"),
    })
}

/// Transient HTTP statuses worth one retry.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}
