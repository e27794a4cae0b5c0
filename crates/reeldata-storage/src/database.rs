// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management: PRAGMA setup, migrations and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread. Do not
//! open additional connections for writes.

use std::time::Duration;

use reeldata_config::StorageConfig;
use reeldata_core::DataError;
use tracing::info;

use crate::migrations;

/// Flattens a tokio-rusqlite error. Errors raised inside a closure pass
/// through unchanged; connection-level failures become `Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<DataError>) -> DataError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => DataError::storage(other.to_string()),
    }
}

/// Handle on the single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database file, applies PRAGMAs and runs
    /// pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, DataError> {
        let path = std::path::Path::new(&config.database_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(DataError::storage)?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| DataError::storage(e.to_string()))?;
        let db = Self { conn };
        db.prepare(config.wal_mode, config.busy_timeout_ms).await?;
        info!(path = %config.database_path, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, DataError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| DataError::storage(e.to_string()))?;
        let db = Self { conn };
        db.prepare(false, 5000).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool, busy_timeout_ms: u64) -> Result<(), DataError> {
        self.conn
            .call(move |conn| -> Result<(), DataError> {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")
                        .map_err(DataError::storage)?;
                    conn.pragma_update(None, "synchronous", "NORMAL")
                        .map_err(DataError::storage)?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")
                    .map_err(DataError::storage)?;
                conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
                    .map_err(DataError::storage)?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(map_tr_err)
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Runs `f` on the connection thread.
    pub async fn run<F, R>(&self, f: F) -> Result<R, DataError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, DataError> + Send + 'static,
        R: Send + 'static,
    {
        self.conn.call(f).await.map_err(map_tr_err)
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), DataError> {
        self.checkpoint().await?;
        self.conn
            .close()
            .await
            .map_err(|e| DataError::storage(e.to_string()))
    }

    pub async fn checkpoint(&self) -> Result<(), DataError> {
        self.run(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(DataError::storage)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/data/reeldata.db");
        let db = Database::open(&StorageConfig::at(path.to_string_lossy())).await.unwrap();
        assert!(path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn pragmas_are_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pragmas.db");
        let db = Database::open(&StorageConfig::at(path.to_string_lossy())).await.unwrap();
        let (journal, fks): (String, i64) = db
            .run(|conn| {
                let journal = conn
                    .query_row("PRAGMA journal_mode", [], |r| r.get(0))
                    .map_err(DataError::storage)?;
                let fks = conn
                    .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
                    .map_err(DataError::storage)?;
                Ok((journal, fks))
            })
            .await
            .unwrap();
        assert_eq!(journal.to_lowercase(), "wal");
        assert_eq!(fks, 1);
    }

    #[tokio::test]
    async fn reopening_does_not_rerun_migrations() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::at(dir.path().join("twice.db").to_string_lossy());
        Database::open(&config).await.unwrap().close().await.unwrap();
        let db = Database::open(&config).await.unwrap();
        let applied: i64 = db
            .run(|conn| {
                conn.query_row("SELECT COUNT(*) FROM refinery_schema_history", [], |r| r.get(0))
                    .map_err(DataError::storage)
            })
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }
}
