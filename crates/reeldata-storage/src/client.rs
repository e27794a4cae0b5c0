// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async entry point for callers.
//!
//! [`DataClient`] compiles each [`Operation`] on the calling task, so shape
//! errors never reach the database, then runs the compiled plan as a single
//! closure on the writer thread inside its own transaction. Per-entity
//! [`ModelClient`]s wrap this in typed methods.

use std::sync::Arc;

use reeldata_config::ReeldataConfig;
use reeldata_core::query::{
    AggregateArgs, AggregateResult, CountArgs, CreateArgs, CreateManyArgs, DeleteArgs, DeleteManyArgs,
    FindManyArgs, FindUniqueArgs, GroupByArgs, GroupRow, UpdateArgs, UpdateManyArgs, UpsertArgs,
};
use reeldata_core::{
    compile, Action, BatchPayload, CountResult, DataError, Entity, EntitySchema, Operation, OperationOutput,
    SchemaRegistry, ShapedRecord, TransactionOptions,
};
use serde_json::Value as JsonValue;

use crate::database::Database;
use crate::executor::{begin, Executor};
use crate::raw::{self, RawRow};

/// Shared handle for running operations. Cheap to clone.
#[derive(Clone)]
pub struct DataClient {
    db: Database,
    registry: Arc<SchemaRegistry>,
    tx_defaults: TransactionOptions,
}

impl DataClient {
    pub fn new(db: Database, tx_defaults: TransactionOptions) -> Self {
        Self {
            db,
            registry: Arc::new(SchemaRegistry::new()),
            tx_defaults,
        }
    }

    /// Opens the configured database and returns a client over it.
    pub async fn connect(config: &ReeldataConfig) -> Result<Self, DataError> {
        let db = Database::open(&config.storage).await?;
        Ok(Self::new(db, config.transaction.options()))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn registry_handle(&self) -> Arc<SchemaRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn transaction_defaults(&self) -> TransactionOptions {
        self.tx_defaults
    }

    /// Looks up an entity schema by name.
    pub fn describe(&self, name: &str) -> Result<&EntitySchema, DataError> {
        self.registry.describe(name)
    }

    /// Compiles and runs one operation atomically.
    pub async fn execute(&self, op: Operation) -> Result<OperationOutput, DataError> {
        let compiled = compile(&self.registry, &op)?;
        let registry = self.registry_handle();
        self.db
            .run(move |conn| {
                let tx = begin(conn, compiled.is_write())?;
                let output = Executor::new(&tx, &registry).execute(&compiled)?;
                tx.commit().map_err(DataError::storage)?;
                Ok(output)
            })
            .await
    }

    pub fn model(&self, entity: Entity) -> ModelClient<'_> {
        ModelClient { client: self, entity }
    }

    pub fn user(&self) -> ModelClient<'_> {
        self.model(Entity::User)
    }

    pub fn otp_code(&self) -> ModelClient<'_> {
        self.model(Entity::OtpCode)
    }

    pub fn session(&self) -> ModelClient<'_> {
        self.model(Entity::Session)
    }

    pub fn subscription(&self) -> ModelClient<'_> {
        self.model(Entity::Subscription)
    }

    pub fn subscription_history(&self) -> ModelClient<'_> {
        self.model(Entity::SubscriptionHistory)
    }

    pub fn video(&self) -> ModelClient<'_> {
        self.model(Entity::Video)
    }

    pub fn analytics_event(&self) -> ModelClient<'_> {
        self.model(Entity::AnalyticsEvent)
    }

    /// Executes raw SQL, returning the number of changed rows.
    pub async fn execute_raw(&self, sql: impl Into<String>, params: Vec<JsonValue>) -> Result<usize, DataError> {
        let sql = sql.into();
        self.db.run(move |conn| raw::execute_raw(conn, &sql, &params)).await
    }

    /// Runs a raw query, returning rows keyed by column name.
    pub async fn query_raw(&self, sql: impl Into<String>, params: Vec<JsonValue>) -> Result<Vec<RawRow>, DataError> {
        let sql = sql.into();
        self.db.run(move |conn| raw::query_raw(conn, &sql, &params)).await
    }
}

/// Operations on one entity.
pub struct ModelClient<'a> {
    client: &'a DataClient,
    entity: Entity,
}

impl ModelClient<'_> {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    async fn run(&self, action: Action) -> Result<OperationOutput, DataError> {
        self.client.execute(Operation::new(self.entity, action)).await
    }

    pub async fn find_unique(&self, args: FindUniqueArgs) -> Result<Option<ShapedRecord>, DataError> {
        self.run(Action::FindUnique(args)).await?.into_optional()
    }

    pub async fn find_unique_or_throw(&self, args: FindUniqueArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::FindUniqueOrThrow(args)).await?.into_record()
    }

    pub async fn find_first(&self, args: FindManyArgs) -> Result<Option<ShapedRecord>, DataError> {
        self.run(Action::FindFirst(args)).await?.into_optional()
    }

    pub async fn find_first_or_throw(&self, args: FindManyArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::FindFirstOrThrow(args)).await?.into_record()
    }

    pub async fn find_many(&self, args: FindManyArgs) -> Result<Vec<ShapedRecord>, DataError> {
        self.run(Action::FindMany(args)).await?.into_records()
    }

    pub async fn create(&self, args: CreateArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Create(args)).await?.into_record()
    }

    pub async fn create_many(&self, args: CreateManyArgs) -> Result<BatchPayload, DataError> {
        self.run(Action::CreateMany(args)).await?.into_batch()
    }

    pub async fn update(&self, args: UpdateArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Update(args)).await?.into_record()
    }

    pub async fn update_many(&self, args: UpdateManyArgs) -> Result<BatchPayload, DataError> {
        self.run(Action::UpdateMany(args)).await?.into_batch()
    }

    pub async fn upsert(&self, args: UpsertArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Upsert(args)).await?.into_record()
    }

    pub async fn delete(&self, args: DeleteArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Delete(args)).await?.into_record()
    }

    pub async fn delete_many(&self, args: DeleteManyArgs) -> Result<BatchPayload, DataError> {
        self.run(Action::DeleteMany(args)).await?.into_batch()
    }

    pub async fn aggregate(&self, args: AggregateArgs) -> Result<AggregateResult, DataError> {
        self.run(Action::Aggregate(args)).await?.into_aggregate()
    }

    pub async fn group_by(&self, args: GroupByArgs) -> Result<Vec<GroupRow>, DataError> {
        self.run(Action::GroupBy(args)).await?.into_groups()
    }

    pub async fn count(&self, args: CountArgs) -> Result<CountResult, DataError> {
        self.run(Action::Count(args)).await?.into_count()
    }
}
