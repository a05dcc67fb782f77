// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Morpho face-swap bot.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use morpho_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Bot name: {}", config.agent.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::MorphoConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to diagnostics with typo suggestions
///
/// Returns either a valid `MorphoConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<MorphoConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<MorphoConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_inline_config_loads() {
        let config = load_and_validate_str(
            r#"
[telegram]
bot_token = "123:abc"
"#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
    }

    #[test]
    fn invalid_values_surface_as_validation_errors() {
        let errors = load_and_validate_str(
            r#"
[inference]
timeout_secs = 0
"#,
        )
        .unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("timeout_secs"))
        ));
    }

    #[test]
    fn typo_surfaces_as_unknown_key() {
        let errors = load_and_validate_str(
            r#"
[quota]
starter_qota = 5
"#,
        )
        .unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { suggestion, .. }
                if suggestion.as_deref() == Some("starter_quota")
        )));
    }
}
