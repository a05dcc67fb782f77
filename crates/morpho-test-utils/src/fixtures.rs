// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures: temp-backed account stores, an on-disk sample catalog,
//! and inbound update builders.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use morpho_accounts::{AccountStore, QuotaPolicy};
use morpho_catalog::Catalog;
use morpho_config::model::StorageConfig;
use morpho_core::AccountsAdapter;
use morpho_core::types::{Command, InboundPayload, InboundUpdate};
use morpho_storage::SqliteAccounts;
use tempfile::TempDir;

/// A quota policy suited to tests: small numbers, short watchdog window.
pub fn test_policy(starter_quota: i64) -> QuotaPolicy {
    QuotaPolicy {
        starter_quota,
        premium_bonus: 100,
        premium_ceiling: None,
        reservation_max_lifetime: Duration::from_secs(120),
    }
}

/// Builds an [`AccountStore`] over a fresh temp-directory SQLite database.
///
/// The returned `TempDir` must be kept alive for the store's lifetime.
pub async fn temp_account_store(policy: QuotaPolicy) -> (Arc<AccountStore>, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let config = StorageConfig {
        database_path: dir.path().join("accounts.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };
    let storage = SqliteAccounts::new(config);
    storage.initialize().await.expect("storage init");
    (Arc::new(AccountStore::new(Arc::new(storage), policy)), dir)
}

/// Writes a two-category catalog (art: mona_lisa + scream, memes: doge) to
/// disk and loads it.
pub fn sample_catalog() -> (Arc<Catalog>, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let manifest = r#"
[[categories]]
name = "art"
collage = "collages/art.png"

[[categories.targets]]
mode = "mona_lisa"
name = "Mona Lisa"
file = "targets/art/mona_lisa.png"

[[categories.targets]]
mode = "scream"
name = "The Scream"
file = "targets/art/scream.png"

[[categories]]
name = "memes"
collage = "collages/memes.png"

[[categories.targets]]
mode = "doge"
name = "Doge"
file = "targets/memes/doge.png"
"#;
    let manifest_path = dir.path().join("targets.toml");
    fs::write(&manifest_path, manifest).expect("write manifest");
    for rel in [
        "collages/art.png",
        "collages/memes.png",
        "targets/art/mona_lisa.png",
        "targets/art/scream.png",
        "targets/memes/doge.png",
    ] {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"png").expect("touch");
    }

    let catalog = Catalog::load(&manifest_path).expect("catalog load");
    (Arc::new(catalog), dir)
}

/// An inbound photo submission from `user_id` (chat id mirrors the user).
pub fn photo_update(user_id: &str, data: &[u8]) -> InboundUpdate {
    InboundUpdate {
        id: format!("test-{}", uuid::Uuid::new_v4()),
        user_id: user_id.to_string(),
        chat_id: user_id.to_string(),
        payload: InboundPayload::Photo {
            data: data.to_vec(),
            caption: None,
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// An inbound command from `user_id`.
pub fn command_update(user_id: &str, command: Command) -> InboundUpdate {
    InboundUpdate {
        id: format!("test-{}", uuid::Uuid::new_v4()),
        user_id: user_id.to_string(),
        chat_id: user_id.to_string(),
        payload: InboundPayload::Command(command),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn temp_store_starts_accounts_with_policy_quota() {
        let (store, _dir) = temp_account_store(test_policy(7)).await;
        let account = store.get_or_create("u1").await.unwrap();
        assert_eq!(account.quota_remaining, 7);
    }

    #[test]
    fn sample_catalog_has_expected_shape() {
        let (catalog, _dir) = sample_catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get_category("art").unwrap().targets.len(), 2);
        assert!(catalog.resolve_target("memes", Some("doge")).is_ok());
    }
}
