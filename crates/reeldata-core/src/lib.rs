// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Reeldata data-access layer.
//!
//! This crate holds everything that does not touch a database: the schema
//! registry of the seven entities, the filter builder, query compilation into
//! [`Plan`]s, write payload validation, data-model invariants and the result
//! shaper. Storage backends implement the traits in [`traits`] and execute
//! compiled plans.

pub mod error;
pub mod models;
pub mod query;
pub mod record;
pub mod rules;
pub mod schema;
pub mod shape;
pub mod traits;
pub mod types;
pub mod value;

// Re-export key items at crate root for ergonomic imports.
pub use error::{DataError, ErrorKind};
pub use query::{compile, Action, CompiledOperation, CountResult, Operation, OperationOutput, Plan};
pub use record::{Record, Related, ShapedRecord};
pub use schema::{Entity, EntitySchema, SchemaRegistry};
pub use shape::Shaper;
pub use types::{BatchPayload, HealthStatus, IsolationLevel, TransactionOptions};
pub use value::{any_null, db_null, json_null, NullSentinel, Value};

pub use traits::{PluginAdapter, RelationResolver, StorageAdapter};
