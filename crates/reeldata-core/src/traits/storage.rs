// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for record stores.

use async_trait::async_trait;

use crate::error::DataError;
use crate::traits::adapter::PluginAdapter;

/// Lifecycle of the store behind the dispatcher.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the store and applies pending migrations.
    async fn initialize(&self) -> Result<(), DataError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), DataError>;
}
