// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Morpho - a Telegram face-swap bot.
//!
//! This is the binary entry point for the Morpho daemon.

mod serve;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Morpho - a Telegram face-swap bot.
#[derive(Parser, Debug)]
#[command(name = "morpho", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot daemon.
    Serve,
    /// Validate the catalog manifest and list its categories.
    Catalog,
    /// Print the resolved configuration.
    Config,
    /// Reset a user's quota to the starter value (administrative).
    ResetUser {
        /// The user id to reset.
        user_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match morpho_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            morpho_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.agent.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config).await {
                tracing::error!(error = %e, "morpho exited with an error");
                std::process::exit(1);
            }
        }
        Some(Commands::Catalog) => {
            let manifest_path = Path::new(&config.catalog.manifest_path);
            match morpho_catalog::Catalog::load(manifest_path) {
                Ok(catalog) => {
                    println!("catalog ok: {} categories", catalog.len());
                    for (name, collage) in catalog.list_categories() {
                        let targets = catalog
                            .get_category(name)
                            .map(|c| c.targets.len())
                            .unwrap_or(0);
                        println!("  {name}: {targets} targets, collage {}", collage.display());
                    }
                }
                Err(e) => {
                    eprintln!("catalog error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("failed to render config: {e}");
                std::process::exit(1);
            }
        },
        Some(Commands::ResetUser { user_id }) => {
            if let Err(e) = reset_user(&config, &user_id).await {
                eprintln!("reset failed: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("morpho: use --help for available commands");
        }
    }
}

/// Opens the account store and resets one user's quota to the starter value.
async fn reset_user(
    config: &morpho_config::MorphoConfig,
    user_id: &str,
) -> Result<(), morpho_core::MorphoError> {
    use std::sync::Arc;

    use morpho_accounts::{AccountStore, QuotaPolicy};
    use morpho_core::AccountsAdapter;
    use morpho_storage::SqliteAccounts;

    let storage = SqliteAccounts::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn AccountsAdapter> = Arc::new(storage);
    let store = AccountStore::new(storage.clone(), QuotaPolicy::from_config(&config.quota));

    let account = store.reset_quota(user_id).await?;
    println!(
        "user {} reset: {} swaps remaining ({})",
        account.user_id, account.quota_remaining, account.tier
    );

    storage.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_is_valid() {
        let config = morpho_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "morpho");
    }
}
