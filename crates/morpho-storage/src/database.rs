// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use morpho_core::MorphoError;
use tracing::debug;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Convert a tokio-rusqlite error into `MorphoError::Storage`.
pub(crate) fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> MorphoError
where
    E: std::error::Error + Send + Sync + 'static,
{
    MorphoError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database.
///
/// Owns the single tokio-rusqlite connection; all query modules go through
/// [`connection`](Self::connection).
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, applies PRAGMA
    /// setup and embedded migrations.
    pub async fn open(path: &str) -> Result<Self, MorphoError> {
        Self::open_with_options(path, true).await
    }

    /// Opens the database, optionally without WAL mode (for tests on
    /// filesystems where WAL misbehaves).
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, MorphoError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| MorphoError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| MorphoError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            }
            conn.execute_batch(
                "PRAGMA synchronous=NORMAL;
                 PRAGMA foreign_keys=ON;
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), refinery::Error> {
            embedded::migrations::runner().run(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path, "database opened and migrated");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes cleanly.
    pub async fn close(&self) -> Result<(), MorphoError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
