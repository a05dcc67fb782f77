// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Morpho face-swap bot.

use thiserror::Error;

/// The primary error type used across Morpho adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MorphoError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, message format, delivery failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Inference boundary errors that are not one of the classified [`SwapError`]
    /// outcomes (client construction, invalid endpoint configuration).
    #[error("inference error: {message}")]
    Inference {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Classified failures from the face-swap inference boundary.
///
/// The orchestrator uses this classification to decide charge vs. no-charge
/// and which user-facing reply to produce, so connection failures must never
/// be conflated with "the service answered but found no face".
#[derive(Debug, Error)]
pub enum SwapError {
    /// The service processed the image but detected no face. Never retried,
    /// never charged.
    #[error("no face detected in the submitted image")]
    NoFaceDetected,

    /// The service could not be reached or answered with a transient failure.
    #[error("inference service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// The request exceeded the configured deadline.
    #[error("inference request timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The service answered with a shape this client does not understand,
    /// or a referenced target image could not be read. Indicates drift in
    /// the external contract or catalog data, not user error.
    #[error("unexpected inference response: {message}")]
    Protocol { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morpho_error_has_all_variants() {
        let _config = MorphoError::Config("test".into());
        let _storage = MorphoError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = MorphoError::Channel {
            message: "test".into(),
            source: None,
        };
        let _inference = MorphoError::Inference {
            message: "test".into(),
            source: None,
        };
        let _timeout = MorphoError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = MorphoError::Internal("test".into());
    }

    #[test]
    fn swap_error_messages_are_distinct() {
        let no_face = SwapError::NoFaceDetected.to_string();
        let unavailable = SwapError::ServiceUnavailable {
            message: "connection refused".into(),
        }
        .to_string();
        let timeout = SwapError::Timeout {
            duration: std::time::Duration::from_secs(20),
        }
        .to_string();
        let protocol = SwapError::Protocol {
            message: "missing field".into(),
        }
        .to_string();

        assert!(no_face.contains("no face"));
        assert!(unavailable.contains("unavailable"));
        assert!(timeout.contains("timed out"));
        assert!(protocol.contains("unexpected"));
    }
}
