// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` opens a temp SQLite database through [`SqliteStorage`],
//! runs the migrations and exposes a [`DataClient`] over it. The directory
//! is removed when the harness is dropped.

use std::path::PathBuf;
use std::sync::Arc;

use reeldata_config::{ReeldataConfig, StorageConfig, TransactionConfig};
use reeldata_core::{DataError, IsolationLevel, StorageAdapter};
use reeldata_storage::{DataClient, SqliteStorage};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    wal_mode: bool,
    max_wait_ms: Option<u64>,
    timeout_ms: Option<u64>,
    isolation_level: Option<IsolationLevel>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            wal_mode: true,
            max_wait_ms: None,
            timeout_ms: None,
            isolation_level: None,
        }
    }

    /// Use the rollback journal instead of WAL.
    pub fn without_wal(mut self) -> Self {
        self.wal_mode = false;
        self
    }

    /// Default transaction limits for the client.
    pub fn with_transaction_limits(mut self, max_wait_ms: u64, timeout_ms: u64) -> Self {
        self.max_wait_ms = Some(max_wait_ms);
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    /// Build the harness: temp directory, initialized storage and client.
    pub async fn build(self) -> Result<TestHarness, DataError> {
        let temp_dir = tempfile::TempDir::new().map_err(DataError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let defaults = TransactionConfig::default();
        let config = ReeldataConfig {
            storage: StorageConfig {
                wal_mode: self.wal_mode,
                ..StorageConfig::at(db_path.to_string_lossy())
            },
            transaction: TransactionConfig {
                max_wait_ms: self.max_wait_ms.unwrap_or(defaults.max_wait_ms),
                timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
                isolation_level: self.isolation_level.unwrap_or(defaults.isolation_level),
            },
            ..ReeldataConfig::default()
        };

        let storage = SqliteStorage::from_config(&config);
        storage.initialize().await?;
        let client = storage.client()?;
        tracing::debug!(path = %db_path.display(), "test harness ready");

        Ok(TestHarness {
            storage: Arc::new(storage),
            client,
            config,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

/// A temp database with a client over it.
pub struct TestHarness {
    /// Storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub client: DataClient,
    pub config: ReeldataConfig,
    db_path: PathBuf,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub async fn new() -> Result<Self, DataError> {
        Self::builder().build().await
    }

    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    /// A second client sharing this harness's connection.
    pub fn client(&self) -> DataClient {
        self.client.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reeldata_core::{HealthStatus, PluginAdapter};

    #[tokio::test]
    async fn builds_and_cleans_up() {
        let harness = TestHarness::builder()
            .with_transaction_limits(100, 300)
            .build()
            .await
            .unwrap();
        let path = harness.db_path().to_path_buf();
        assert!(path.exists());
        assert_eq!(harness.client.transaction_defaults().timeout.as_millis(), 300);
        assert_eq!(harness.storage.health_check().await.unwrap(), HealthStatus::Healthy);

        drop(harness);
        assert!(!path.exists());
    }
}
