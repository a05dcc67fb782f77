// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, positive timeouts, and coherent
//! quota policy values.

use crate::diagnostic::ConfigError;
use crate::model::MorphoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MorphoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.catalog.manifest_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "catalog.manifest_path must not be empty".to_string(),
        });
    }

    if config.catalog.custom_targets_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "catalog.custom_targets_dir must not be empty".to_string(),
        });
    }

    let base_url = config.inference.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!(
                "inference.base_url must be an http(s) URL, got `{base_url}`"
            ),
        });
    }

    if config.inference.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "inference.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.agent.max_inflight == 0 {
        errors.push(ConfigError::Validation {
            message: "agent.max_inflight must be at least 1".to_string(),
        });
    }

    if config.quota.starter_quota < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "quota.starter_quota must be non-negative, got {}",
                config.quota.starter_quota
            ),
        });
    }

    if config.quota.premium_bonus < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "quota.premium_bonus must be non-negative, got {}",
                config.quota.premium_bonus
            ),
        });
    }

    if let Some(ceiling) = config.quota.premium_ceiling
        && ceiling < 0
    {
        errors.push(ConfigError::Validation {
            message: format!("quota.premium_ceiling must be non-negative, got {ceiling}"),
        });
    }

    if config.quota.reservation_max_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "quota.reservation_max_secs must be at least 1".to_string(),
        });
    }

    if config.quota.watchdog_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "quota.watchdog_interval_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = MorphoConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = MorphoConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn non_http_base_url_fails_validation() {
        let mut config = MorphoConfig::default();
        config.inference.base_url = "ftp://swap.internal".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("base_url"))
        ));
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = MorphoConfig::default();
        config.inference.timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("timeout_secs"))
        ));
    }

    #[test]
    fn negative_quota_values_fail_validation() {
        let mut config = MorphoConfig::default();
        config.quota.starter_quota = -1;
        config.quota.premium_bonus = -5;
        config.quota.premium_ceiling = Some(-10);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ConfigError::Validation { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn multiple_errors_are_collected() {
        let mut config = MorphoConfig::default();
        config.storage.database_path = "".to_string();
        config.agent.max_inflight = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
