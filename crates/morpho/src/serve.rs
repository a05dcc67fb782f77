// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daemon startup wiring: config -> catalog -> storage -> account store ->
//! swap client -> Telegram channel -> agent loop.
//!
//! The catalog is loaded before anything else and a load failure is fatal:
//! a bot with a broken target catalog must not come up half-working.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use morpho_accounts::{AccountStore, QuotaPolicy, spawn_watchdog};
use morpho_agent::{AgentLoop, shutdown};
use morpho_catalog::Catalog;
use morpho_config::MorphoConfig;
use morpho_core::{
    AccountsAdapter, ChannelAdapter, HealthStatus, MorphoError, PluginAdapter, SwapEngine,
};
use morpho_storage::SqliteAccounts;
use morpho_swap::SwapClient;
use morpho_telegram::TelegramChannel;
use tracing::{info, warn};

/// Runs the daemon until a shutdown signal arrives.
pub async fn run(config: MorphoConfig) -> Result<(), MorphoError> {
    info!(bot_name = config.agent.name.as_str(), "morpho starting");

    // Catalog first, fail fast and loudly.
    let catalog = Catalog::load(Path::new(&config.catalog.manifest_path))
        .map_err(|e| MorphoError::Config(format!("catalog load failed: {e}")))?;
    info!(categories = catalog.len(), "catalog loaded");

    // Durable account storage.
    let storage = SqliteAccounts::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn AccountsAdapter> = Arc::new(storage);
    let accounts = Arc::new(AccountStore::new(
        storage,
        QuotaPolicy::from_config(&config.quota),
    ));

    // Inference client. An unhealthy service at startup is worth a warning
    // but not fatal -- it may come up later, and requests fail safe.
    let engine = SwapClient::new(&config.inference)?;
    match engine.health_check().await {
        Ok(HealthStatus::Healthy) => info!("swap service reachable"),
        Ok(HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason)) => {
            warn!(reason = %reason, "swap service not healthy at startup");
        }
        Err(e) => warn!(error = %e, "swap service health check failed"),
    }
    let engine: Arc<dyn SwapEngine> = Arc::new(engine);

    // Telegram channel.
    let mut channel = TelegramChannel::new(&config.telegram)?;
    channel.connect().await?;
    let channel: Arc<dyn ChannelAdapter> = Arc::new(channel);

    // Shutdown signal + reservation watchdog.
    let cancel = shutdown::install_signal_handler();
    let watchdog = spawn_watchdog(
        accounts.clone(),
        Duration::from_secs(config.quota.watchdog_interval_secs),
        cancel.clone(),
    );

    let agent = AgentLoop::new(channel, accounts, Arc::new(catalog), engine, config);
    let result = agent.run(cancel.clone()).await;

    // Stop the watchdog even if the loop exited on its own (channel close).
    cancel.cancel();
    if let Err(e) = watchdog.await {
        warn!(error = %e, "watchdog task did not exit cleanly");
    }

    info!("morpho stopped");
    result
}
