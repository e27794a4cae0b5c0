// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite backend for the Reeldata data-access layer.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. Operations compiled
//! by `reeldata-core` are executed against the seven entity tables, each in
//! its own transaction, through [`DataClient`].

pub mod adapter;
pub mod client;
pub mod codec;
pub mod database;
pub mod executor;
pub mod migrations;
pub mod raw;
pub mod transaction;

pub use adapter::SqliteStorage;
pub use client::{DataClient, ModelClient};
pub use database::Database;
pub use raw::RawRow;
pub use transaction::{TxClient, TxModel};
