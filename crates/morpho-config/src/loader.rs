// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./morpho.toml` > `~/.config/morpho/morpho.toml` > `/etc/morpho/morpho.toml`
//! with environment variable overrides via `MORPHO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MorphoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/morpho/morpho.toml` (system-wide)
/// 3. `~/.config/morpho/morpho.toml` (user XDG config)
/// 4. `./morpho.toml` (local directory)
/// 5. `MORPHO_*` environment variables
pub fn load_config() -> Result<MorphoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MorphoConfig::default()))
        .merge(Toml::file("/etc/morpho/morpho.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("morpho/morpho.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("morpho.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<MorphoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MorphoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MorphoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MorphoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `MORPHO_TELEGRAM_BOT_TOKEN`
/// must map to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("MORPHO_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: MORPHO_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("inference_", "inference.", 1)
            .replacen("catalog_", "catalog.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("quota_", "quota.", 1);
        mapped.into()
    })
}
