// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account row operations.
//!
//! Every mutation stamps `updated_at`. The quota decrement is guarded in
//! SQL (`quota_remaining > 0`) so the counter can never go negative even
//! under caller bugs; the schema CHECK constraint backs this up.

use std::str::FromStr;

use morpho_core::{MorphoError, Tier, UserAccount};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

fn row_to_account(row: &rusqlite::Row<'_>) -> Result<UserAccount, rusqlite::Error> {
    let tier_str: String = row.get(2)?;
    let tier = Tier::from_str(&tier_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(UserAccount {
        user_id: row.get(0)?,
        quota_remaining: row.get(1)?,
        tier,
        selected_category: row.get(3)?,
        selected_mode: row.get(4)?,
        custom_target_path: row.get(5)?,
        awaiting_target: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const ACCOUNT_COLUMNS: &str = "user_id, quota_remaining, tier, selected_category, \
     selected_mode, custom_target_path, awaiting_target, created_at, updated_at";

/// Fetch an account by user id.
pub async fn get_account(db: &Database, user_id: &str) -> Result<Option<UserAccount>, MorphoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<UserAccount>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ?1"
            ))?;
            let result = stmt.query_row(params![user_id], row_to_account);
            match result {
                Ok(account) => Ok(Some(account)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert an account if absent. Existing rows are left untouched, which
/// makes `get_or_create` idempotent under concurrent first contact.
pub async fn insert_account(db: &Database, account: &UserAccount) -> Result<(), MorphoError> {
    let account = account.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO accounts (user_id, quota_remaining, tier, \
                 selected_category, selected_mode, custom_target_path, awaiting_target, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    account.user_id,
                    account.quota_remaining,
                    account.tier.to_string(),
                    account.selected_category,
                    account.selected_mode,
                    account.custom_target_path,
                    account.awaiting_target as i64,
                    account.created_at,
                    account.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Durably decrement the quota by one. Returns `false` if the quota was
/// already zero (no mutation happened).
pub async fn decrement_quota(db: &Database, user_id: &str) -> Result<bool, MorphoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE accounts SET quota_remaining = quota_remaining - 1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?1 AND quota_remaining > 0",
                params![user_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Set the tier to premium and add the bonus quota in one write.
pub async fn upgrade_to_premium(
    db: &Database,
    user_id: &str,
    bonus_quota: i64,
) -> Result<(), MorphoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE accounts SET tier = 'premium', \
                 quota_remaining = quota_remaining + ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?2",
                params![bonus_quota, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set the selected category, clearing the selected mode.
pub async fn set_category(db: &Database, user_id: &str, category: &str) -> Result<(), MorphoError> {
    let user_id = user_id.to_string();
    let category = category.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE accounts SET selected_category = ?1, selected_mode = NULL, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?2",
                params![category, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set the selected target mode.
pub async fn set_mode(db: &Database, user_id: &str, mode: &str) -> Result<(), MorphoError> {
    let user_id = user_id.to_string();
    let mode = mode.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE accounts SET selected_mode = ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?2",
                params![mode, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Store the path of an uploaded custom target image.
pub async fn set_custom_target(db: &Database, user_id: &str, path: &str) -> Result<(), MorphoError> {
    let user_id = user_id.to_string();
    let path = path.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE accounts SET custom_target_path = ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?2",
                params![path, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Arm or disarm the "next photo is a custom target" flag.
pub async fn set_awaiting_target(
    db: &Database,
    user_id: &str,
    awaiting: bool,
) -> Result<(), MorphoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE accounts SET awaiting_target = ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?2",
                params![awaiting as i64, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the remaining quota (administrative reset).
pub async fn set_quota(db: &Database, user_id: &str, quota: i64) -> Result<(), MorphoError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE accounts SET quota_remaining = ?1, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE user_id = ?2",
                params![quota, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
