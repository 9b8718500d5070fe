// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use tidings_config::model::StorageConfig;
use tidings_core::TidingsError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations;

/// Converts a tokio-rusqlite error into the store taxonomy.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> TidingsError {
    TidingsError::StoreUnavailable {
        source: Box::new(e),
    }
}

/// Handle to the single SQLite connection shared by the document store and
/// the vector index.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database at the configured path, applies
    /// PRAGMAs, and runs pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, TidingsError> {
        let conn = Connection::open(&config.database_path)
            .await
            .map_err(map_tr_err)?;
        let wal = config.wal_mode;
        let busy_timeout_ms = (config.timeout_secs.max(1) * 1_000).min(i64::MAX as u64) as i64;
        conn.call(move |conn| {
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", busy_timeout_ms)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path = %config.database_path, wal, "database opened");
        Ok(Self { conn })
    }

    /// Opens an in-memory database with migrations applied (tests).
    pub async fn open_in_memory() -> Result<Self, TidingsError> {
        let conn = Connection::open_in_memory().await.map_err(map_tr_err)?;
        conn.call(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!("in-memory database opened");
        Ok(Self { conn })
    }

    /// The underlying shared connection handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flushes the WAL and releases the connection.
    pub async fn close(&self) -> Result<(), TidingsError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_applies_migrations() {
        let db = Database::open_in_memory().await.unwrap();
        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();
        for expected in [
            "articles",
            "chunks",
            "interactions",
            "messages",
            "pipeline_runs",
            "profiles",
            "sessions",
        ] {
            assert!(
                tables.iter().any(|t| t == expected),
                "missing table {expected}: {tables:?}"
            );
        }
    }

    #[tokio::test]
    async fn open_on_disk_is_reopenable() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir
                .path()
                .join("tidings.db")
                .to_string_lossy()
                .into_owned(),
            ..StorageConfig::default()
        };
        let db = Database::open(&config).await.unwrap();
        db.close().await.unwrap();
        // Migrations are idempotent across re-opens.
        let _again = Database::open(&config).await.unwrap();
    }
}
