// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the adapter lifecycle traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use reeldata_config::{ReeldataConfig, StorageConfig};
use reeldata_core::{DataError, HealthStatus, PluginAdapter, StorageAdapter, TransactionOptions};

use crate::client::DataClient;
use crate::database::Database;

/// SQLite-backed storage adapter.
///
/// The database is opened on the first call to
/// [`StorageAdapter::initialize`]; [`client`](Self::client) fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    tx_defaults: TransactionOptions,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            tx_defaults: TransactionOptions::default(),
            db: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ReeldataConfig) -> Self {
        Self {
            config: config.storage.clone(),
            tx_defaults: config.transaction.options(),
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, DataError> {
        self.db
            .get()
            .ok_or_else(|| DataError::storage("storage not initialized -- call initialize() first"))
    }

    /// Returns a client over the open database.
    pub fn client(&self) -> Result<DataClient, DataError> {
        Ok(DataClient::new(self.db()?.clone(), self.tx_defaults))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, DataError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.run(|conn| conn.execute_batch("SELECT 1;").map_err(DataError::storage))
            .await?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DataError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), DataError> {
        let db = Database::open(&self.config).await?;
        self.db
            .set(db)
            .map_err(|_| DataError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DataError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
