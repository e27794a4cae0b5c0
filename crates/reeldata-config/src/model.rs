// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Reeldata data-access layer.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use reeldata_core::{IsolationLevel, TransactionOptions};
use serde::{Deserialize, Serialize};

/// Top-level Reeldata configuration.
///
/// Every section is optional and defaults to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReeldataConfig {
    /// SQLite store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Defaults for the callback form of transactions.
    #[serde(default)]
    pub transaction: TransactionConfig,

    /// Log level and output format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long SQLite waits on a lock held by another process.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StorageConfig {
    /// Configuration for a database file at `path`, everything else default.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("reeldata").join("reeldata.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("reeldata.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Transaction limits applied when a caller does not pass its own.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionConfig {
    /// Longest wait for a transaction to start.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Longest run time of a transaction body.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub isolation_level: IsolationLevel,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: default_max_wait_ms(),
            timeout_ms: default_timeout_ms(),
            isolation_level: IsolationLevel::default(),
        }
    }
}

impl TransactionConfig {
    pub fn options(&self) -> TransactionOptions {
        TransactionOptions {
            max_wait: Duration::from_millis(self.max_wait_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            isolation_level: self.isolation_level,
        }
    }
}

fn default_max_wait_ms() -> u64 {
    2000
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
