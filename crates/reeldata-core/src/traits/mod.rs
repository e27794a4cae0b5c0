// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the query layer and storage backends.
//!
//! Lifecycle traits use `#[async_trait]` for dynamic dispatch compatibility.
//! [`RelationResolver`] is synchronous: it is called while a backend already
//! holds its connection.

pub mod adapter;
pub mod resolver;
pub mod storage;

pub use adapter::PluginAdapter;
pub use resolver::RelationResolver;
pub use storage::StorageAdapter;
