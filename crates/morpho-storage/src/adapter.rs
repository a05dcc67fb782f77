// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the AccountsAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use morpho_config::model::StorageConfig;
use morpho_core::{
    AccountsAdapter, AdapterType, HealthStatus, MorphoError, PluginAdapter, UserAccount,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed accounts adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query module. The database is lazily initialized on the first
/// call to [`AccountsAdapter::initialize`].
pub struct SqliteAccounts {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteAccounts {
    /// Create a new SqliteAccounts with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, MorphoError> {
        self.db.get().ok_or_else(|| MorphoError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteAccounts {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MorphoError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MorphoError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl AccountsAdapter for SqliteAccounts {
    async fn initialize(&self) -> Result<(), MorphoError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| MorphoError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite accounts storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MorphoError> {
        self.db()?.close().await
    }

    async fn get_account(&self, user_id: &str) -> Result<Option<UserAccount>, MorphoError> {
        queries::accounts::get_account(self.db()?, user_id).await
    }

    async fn insert_account(&self, account: &UserAccount) -> Result<(), MorphoError> {
        queries::accounts::insert_account(self.db()?, account).await
    }

    async fn decrement_quota(&self, user_id: &str) -> Result<bool, MorphoError> {
        queries::accounts::decrement_quota(self.db()?, user_id).await
    }

    async fn upgrade_to_premium(
        &self,
        user_id: &str,
        bonus_quota: i64,
    ) -> Result<(), MorphoError> {
        queries::accounts::upgrade_to_premium(self.db()?, user_id, bonus_quota).await
    }

    async fn set_category(&self, user_id: &str, category: &str) -> Result<(), MorphoError> {
        queries::accounts::set_category(self.db()?, user_id, category).await
    }

    async fn set_mode(&self, user_id: &str, mode: &str) -> Result<(), MorphoError> {
        queries::accounts::set_mode(self.db()?, user_id, mode).await
    }

    async fn set_custom_target(&self, user_id: &str, path: &str) -> Result<(), MorphoError> {
        queries::accounts::set_custom_target(self.db()?, user_id, path).await
    }

    async fn set_awaiting_target(&self, user_id: &str, awaiting: bool) -> Result<(), MorphoError> {
        queries::accounts::set_awaiting_target(self.db()?, user_id, awaiting).await
    }

    async fn set_quota(&self, user_id: &str, quota: i64) -> Result<(), MorphoError> {
        queries::accounts::set_quota(self.db()?, user_id, quota).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morpho_core::Tier;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    fn make_account(user_id: &str, quota: i64) -> UserAccount {
        UserAccount {
            user_id: user_id.to_string(),
            quota_remaining: quota,
            tier: Tier::Free,
            selected_category: None,
            selected_mode: None,
            custom_target_path: None,
            awaiting_target: false,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn adapter_metadata() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("meta.db");
        let storage = SqliteAccounts::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init.db");
        let storage = SqliteAccounts::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double.db");
        let storage = SqliteAccounts::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_fails_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteAccounts::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn full_account_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteAccounts::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        storage.insert_account(&make_account("u1", 5)).await.unwrap();

        let account = storage.get_account("u1").await.unwrap().unwrap();
        assert_eq!(account.quota_remaining, 5);
        assert_eq!(account.tier, Tier::Free);

        assert!(storage.decrement_quota("u1").await.unwrap());
        storage.upgrade_to_premium("u1", 100).await.unwrap();
        storage.set_category("u1", "art").await.unwrap();
        storage.set_mode("u1", "mona_lisa").await.unwrap();
        storage.set_custom_target("u1", "/t/u1.png").await.unwrap();
        storage.set_awaiting_target("u1", true).await.unwrap();

        let account = storage.get_account("u1").await.unwrap().unwrap();
        assert_eq!(account.quota_remaining, 104);
        assert_eq!(account.tier, Tier::Premium);
        assert_eq!(account.selected_category.as_deref(), Some("art"));
        assert_eq!(account.selected_mode.as_deref(), Some("mona_lisa"));
        assert_eq!(account.custom_target_path.as_deref(), Some("/t/u1.png"));
        assert!(account.awaiting_target);

        storage.shutdown().await.unwrap();
    }
}
