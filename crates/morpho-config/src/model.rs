// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Morpho face-swap bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Morpho configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MorphoConfig {
    /// Bot identity and runtime settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Face-swap inference service settings.
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Target-asset catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Quota and entitlement policy settings.
    #[serde(default)]
    pub quota: QuotaConfig,
}

/// Bot identity and runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bot.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Maximum number of swap requests in flight across all users.
    /// Protects the inference service from being overwhelmed.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_inflight: default_max_inflight(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "morpho".to_string()
}

fn default_max_inflight() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables the Telegram adapter.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Face-swap inference service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InferenceConfig {
    /// Base URL of the swap service.
    #[serde(default = "default_inference_base_url")]
    pub base_url: String,

    /// Per-request deadline in seconds. The inference call is the only
    /// long-blocking step in a request and must be bounded.
    #[serde(default = "default_inference_timeout_secs")]
    pub timeout_secs: u64,

    /// Internal retries on transient failures (429/5xx) before surfacing
    /// "try again later" to the user.
    #[serde(default = "default_inference_max_retries")]
    pub max_retries: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_base_url(),
            timeout_secs: default_inference_timeout_secs(),
            max_retries: default_inference_max_retries(),
        }
    }
}

fn default_inference_base_url() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_inference_timeout_secs() -> u64 {
    20
}

fn default_inference_max_retries() -> u32 {
    1
}

/// Target-asset catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Path to the catalog manifest (TOML).
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Directory where premium users' uploaded target images are stored.
    #[serde(default = "default_custom_targets_dir")]
    pub custom_targets_dir: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            manifest_path: default_manifest_path(),
            custom_targets_dir: default_custom_targets_dir(),
        }
    }
}

fn default_manifest_path() -> String {
    "targets.toml".to_string()
}

fn default_custom_targets_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("morpho").join("custom_targets"))
        .unwrap_or_else(|| std::path::PathBuf::from("custom_targets"))
        .to_string_lossy()
        .into_owned()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("morpho").join("morpho.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("morpho.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Quota and entitlement policy configuration.
///
/// The premium ceiling and repeat-purchase behavior are policy knobs here,
/// not hard-coded logic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Swaps a fresh account starts with.
    #[serde(default = "default_starter_quota")]
    pub starter_quota: i64,

    /// Swaps added by each premium purchase (additive on repeat purchase).
    #[serde(default = "default_premium_bonus")]
    pub premium_bonus: i64,

    /// When set, premium accounts are quota-blocked at zero like free ones.
    /// `None` means premium accounts are never blocked (the counter still
    /// decrements, for reporting).
    #[serde(default)]
    pub premium_ceiling: Option<i64>,

    /// Maximum lifetime of a reservation in seconds before the watchdog
    /// force-releases it (protects against crashed workers).
    #[serde(default = "default_reservation_max_secs")]
    pub reservation_max_secs: u64,

    /// Interval between watchdog sweeps in seconds.
    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            starter_quota: default_starter_quota(),
            premium_bonus: default_premium_bonus(),
            premium_ceiling: None,
            reservation_max_secs: default_reservation_max_secs(),
            watchdog_interval_secs: default_watchdog_interval_secs(),
        }
    }
}

fn default_starter_quota() -> i64 {
    10
}

fn default_premium_bonus() -> i64 {
    100
}

fn default_reservation_max_secs() -> u64 {
    120
}

fn default_watchdog_interval_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = MorphoConfig::default();
        assert_eq!(config.agent.name, "morpho");
        assert_eq!(config.agent.max_inflight, 8);
        assert_eq!(config.agent.log_level, "info");
        assert!(config.telegram.bot_token.is_none());
        assert_eq!(config.inference.timeout_secs, 20);
        assert_eq!(config.inference.max_retries, 1);
        assert_eq!(config.quota.starter_quota, 10);
        assert_eq!(config.quota.premium_bonus, 100);
        assert!(config.quota.premium_ceiling.is_none());
        assert_eq!(config.quota.reservation_max_secs, 120);
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[telegram]
bot_token = "123:abc"

[quota]
starter_quota = 3
"#;
        let config: MorphoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.quota.starter_quota, 3);
        // Untouched sections keep their defaults.
        assert_eq!(config.quota.premium_bonus, 100);
        assert_eq!(config.agent.name, "morpho");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let toml_str = r#"
[agent]
naem = "typo"
"#;
        assert!(toml::from_str::<MorphoConfig>(toml_str).is_err());
    }

    #[test]
    fn premium_ceiling_deserializes_when_set() {
        let toml_str = r#"
[quota]
premium_ceiling = 500
"#;
        let config: MorphoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.quota.premium_ceiling, Some(500));
    }
}
