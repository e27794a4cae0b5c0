// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-operation transactions.
//!
//! Two forms are offered. [`DataClient::transaction_batch`] takes a list of
//! operations, compiles all of them up front and runs them in one SQLite
//! transaction. [`DataClient::transaction`] hands a synchronous closure a
//! [`TxClient`] with the same model surface; the closure runs on the writer
//! thread, so it must not block on async work.
//!
//! Inside the callback form every operation runs under a savepoint, so a
//! failed operation leaves no partial writes even if the closure recovers
//! from the error and carries on.

use std::time::{Duration, Instant};

use reeldata_core::query::{
    AggregateArgs, AggregateResult, CountArgs, CreateArgs, CreateManyArgs, DeleteArgs, DeleteManyArgs,
    FindManyArgs, FindUniqueArgs, GroupByArgs, GroupRow, UpdateArgs, UpdateManyArgs, UpsertArgs,
};
use reeldata_core::{
    compile, Action, BatchPayload, CountResult, DataError, Entity, IsolationLevel, Operation, OperationOutput,
    SchemaRegistry, ShapedRecord, TransactionOptions,
};
use rusqlite::Connection;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::client::DataClient;
use crate::executor::{begin, Executor};
use crate::raw::{self, RawRow};

const SAVEPOINT: &str = "reeldata_op";

/// SQLite only offers serializable transactions. Stronger requests take the
/// write lock up front; weaker ones start deferred.
fn takes_write_lock(level: IsolationLevel) -> bool {
    matches!(level, IsolationLevel::Serializable | IsolationLevel::RepeatableRead)
}

impl DataClient {
    /// Runs `ops` in order inside one transaction. Any failure rolls back all
    /// of them; nothing is executed if any operation fails to compile.
    pub async fn transaction_batch(&self, ops: Vec<Operation>) -> Result<Vec<OperationOutput>, DataError> {
        let compiled = ops
            .iter()
            .map(|op| compile(self.registry(), op))
            .collect::<Result<Vec<_>, _>>()?;
        let write = compiled.iter().any(|op| op.is_write());
        let registry = self.registry_handle();
        self.database()
            .run(move |conn| {
                let tx = begin(conn, write)?;
                let executor = Executor::new(&tx, &registry);
                let outputs = compiled
                    .iter()
                    .map(|op| executor.execute(op))
                    .collect::<Result<Vec<_>, _>>()?;
                tx.commit().map_err(DataError::storage)?;
                debug!(operations = outputs.len(), "batch transaction committed");
                Ok(outputs)
            })
            .await
    }

    /// Runs `f` in a transaction with the client's default options.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T, DataError>
    where
        F: FnOnce(&TxClient<'_>) -> Result<T, DataError> + Send + 'static,
        T: Send + 'static,
    {
        self.transaction_with(self.transaction_defaults(), f).await
    }

    /// Runs `f` in a transaction. The transaction commits when `f` returns
    /// `Ok` within `options.timeout` and rolls back otherwise.
    pub async fn transaction_with<F, T>(&self, options: TransactionOptions, f: F) -> Result<T, DataError>
    where
        F: FnOnce(&TxClient<'_>) -> Result<T, DataError> + Send + 'static,
        T: Send + 'static,
    {
        let registry = self.registry_handle();
        let queued = Instant::now();
        self.database()
            .run(move |conn| {
                let waited = queued.elapsed();
                if waited > options.max_wait {
                    warn!(?waited, max_wait = ?options.max_wait, "transaction did not start in time");
                    return Err(DataError::TransactionStartTimeout {
                        max_wait: options.max_wait,
                        waited,
                    });
                }

                let tx = begin(conn, takes_write_lock(options.isolation_level))?;
                let client = TxClient {
                    conn: &tx,
                    registry: &registry,
                    started: Instant::now(),
                    timeout: options.timeout,
                };
                let result = f(&client).and_then(|value| client.check_deadline().map(|()| value));
                match result {
                    Ok(value) => {
                        tx.commit().map_err(DataError::storage)?;
                        debug!(elapsed = ?queued.elapsed(), "transaction committed");
                        Ok(value)
                    }
                    Err(e) => {
                        debug!(error = %e, "transaction rolled back");
                        Err(e)
                    }
                }
            })
            .await
    }
}

/// Operation surface available inside [`DataClient::transaction`].
pub struct TxClient<'t> {
    conn: &'t Connection,
    registry: &'t SchemaRegistry,
    started: Instant,
    timeout: Duration,
}

impl<'t> TxClient<'t> {
    fn check_deadline(&self) -> Result<(), DataError> {
        let elapsed = self.started.elapsed();
        if elapsed > self.timeout {
            warn!(?elapsed, timeout = ?self.timeout, "transaction expired");
            return Err(DataError::TransactionExpired {
                timeout: self.timeout,
                elapsed,
            });
        }
        Ok(())
    }

    fn atomically<T>(&self, f: impl FnOnce() -> Result<T, DataError>) -> Result<T, DataError> {
        self.check_deadline()?;
        self.conn
            .execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))
            .map_err(DataError::storage)?;
        match f() {
            Ok(value) => {
                self.conn
                    .execute_batch(&format!("RELEASE {SAVEPOINT}"))
                    .map_err(DataError::storage)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self
                    .conn
                    .execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}"))
                {
                    warn!(error = %rollback, "savepoint rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Compiles and runs one operation in this transaction.
    pub fn execute(&self, op: Operation) -> Result<OperationOutput, DataError> {
        let compiled = compile(self.registry, &op)?;
        self.atomically(|| Executor::new(self.conn, self.registry).execute(&compiled))
    }

    pub fn execute_raw(&self, sql: &str, params: &[JsonValue]) -> Result<usize, DataError> {
        self.atomically(|| raw::execute_raw(self.conn, sql, params))
    }

    pub fn query_raw(&self, sql: &str, params: &[JsonValue]) -> Result<Vec<RawRow>, DataError> {
        self.check_deadline()?;
        raw::query_raw(self.conn, sql, params)
    }

    pub fn model(&self, entity: Entity) -> TxModel<'_, 't> {
        TxModel { tx: self, entity }
    }

    pub fn user(&self) -> TxModel<'_, 't> {
        self.model(Entity::User)
    }

    pub fn otp_code(&self) -> TxModel<'_, 't> {
        self.model(Entity::OtpCode)
    }

    pub fn session(&self) -> TxModel<'_, 't> {
        self.model(Entity::Session)
    }

    pub fn subscription(&self) -> TxModel<'_, 't> {
        self.model(Entity::Subscription)
    }

    pub fn subscription_history(&self) -> TxModel<'_, 't> {
        self.model(Entity::SubscriptionHistory)
    }

    pub fn video(&self) -> TxModel<'_, 't> {
        self.model(Entity::Video)
    }

    pub fn analytics_event(&self) -> TxModel<'_, 't> {
        self.model(Entity::AnalyticsEvent)
    }
}

/// Synchronous counterpart of [`ModelClient`](crate::ModelClient).
pub struct TxModel<'a, 't> {
    tx: &'a TxClient<'t>,
    entity: Entity,
}

impl TxModel<'_, '_> {
    fn run(&self, action: Action) -> Result<OperationOutput, DataError> {
        self.tx.execute(Operation::new(self.entity, action))
    }

    pub fn find_unique(&self, args: FindUniqueArgs) -> Result<Option<ShapedRecord>, DataError> {
        self.run(Action::FindUnique(args))?.into_optional()
    }

    pub fn find_unique_or_throw(&self, args: FindUniqueArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::FindUniqueOrThrow(args))?.into_record()
    }

    pub fn find_first(&self, args: FindManyArgs) -> Result<Option<ShapedRecord>, DataError> {
        self.run(Action::FindFirst(args))?.into_optional()
    }

    pub fn find_first_or_throw(&self, args: FindManyArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::FindFirstOrThrow(args))?.into_record()
    }

    pub fn find_many(&self, args: FindManyArgs) -> Result<Vec<ShapedRecord>, DataError> {
        self.run(Action::FindMany(args))?.into_records()
    }

    pub fn create(&self, args: CreateArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Create(args))?.into_record()
    }

    pub fn create_many(&self, args: CreateManyArgs) -> Result<BatchPayload, DataError> {
        self.run(Action::CreateMany(args))?.into_batch()
    }

    pub fn update(&self, args: UpdateArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Update(args))?.into_record()
    }

    pub fn update_many(&self, args: UpdateManyArgs) -> Result<BatchPayload, DataError> {
        self.run(Action::UpdateMany(args))?.into_batch()
    }

    pub fn upsert(&self, args: UpsertArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Upsert(args))?.into_record()
    }

    pub fn delete(&self, args: DeleteArgs) -> Result<ShapedRecord, DataError> {
        self.run(Action::Delete(args))?.into_record()
    }

    pub fn delete_many(&self, args: DeleteManyArgs) -> Result<BatchPayload, DataError> {
        self.run(Action::DeleteMany(args))?.into_batch()
    }

    pub fn aggregate(&self, args: AggregateArgs) -> Result<AggregateResult, DataError> {
        self.run(Action::Aggregate(args))?.into_aggregate()
    }

    pub fn group_by(&self, args: GroupByArgs) -> Result<Vec<GroupRow>, DataError> {
        self.run(Action::GroupBy(args))?.into_groups()
    }

    pub fn count(&self, args: CountArgs) -> Result<CountResult, DataError> {
        self.run(Action::Count(args))?.into_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use reeldata_core::ErrorKind;
    use serde_json::json;

    async fn client() -> DataClient {
        DataClient::new(Database::open_in_memory().await.unwrap(), TransactionOptions::default())
    }

    async fn count_users(client: &DataClient) -> Option<u64> {
        client.user().count(CountArgs::default()).await.unwrap().total()
    }

    #[tokio::test]
    async fn batch_rolls_back_everything_on_failure() {
        let client = client().await;
        let create = |email: &str| {
            Operation::new(Entity::User, Action::Create(CreateArgs::new(json!({"email": email}))))
        };
        let err = client
            .transaction_batch(vec![create("one@x.com"), create("two@x.com"), create("one@x.com")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UniqueConstraintViolation);
        assert_eq!(count_users(&client).await, Some(0));
    }

    #[tokio::test]
    async fn batch_returns_outputs_in_order() {
        let client = client().await;
        let outputs = client
            .transaction_batch(vec![
                Operation::new(Entity::User, Action::Create(CreateArgs::new(json!({"email": "a@x.com"})))),
                Operation::new(Entity::User, Action::Count(CountArgs::default())),
            ])
            .await
            .unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(matches!(&outputs[1], OperationOutput::Count(CountResult::Total(1))));
    }

    #[tokio::test]
    async fn batch_with_compile_error_runs_nothing() {
        let client = client().await;
        let err = client
            .transaction_batch(vec![
                Operation::new(Entity::User, Action::Create(CreateArgs::new(json!({"email": "a@x.com"})))),
                Operation::new(Entity::User, Action::GroupBy(GroupByArgs::default())),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyGroupByKey);
        assert_eq!(count_users(&client).await, Some(0));
    }

    #[tokio::test]
    async fn callback_commits_on_ok() {
        let client = client().await;
        let id = client
            .transaction(|tx| {
                let user = tx.user().create(CreateArgs::new(json!({"email": "cb@x.com"})))?;
                let id = user.id().unwrap_or_default().to_string();
                tx.session().create(CreateArgs::new(json!({
                    "user": {"connect": {"id": id}},
                    "accessToken": "at",
                    "refreshToken": "rt",
                    "accessTokenExpiresAt": "2030-01-01T00:00:00Z",
                    "refreshTokenExpiresAt": "2030-02-01T00:00:00Z",
                    "deviceId": "d1"
                })))?;
                Ok(id)
            })
            .await
            .unwrap();
        let sessions = client
            .session()
            .count(CountArgs::filter(json!({"userId": id})))
            .await
            .unwrap();
        assert_eq!(sessions.total(), Some(1));
    }

    #[tokio::test]
    async fn callback_error_rolls_back() {
        let client = client().await;
        let err = client
            .transaction(|tx| {
                tx.user().create(CreateArgs::new(json!({"email": "gone@x.com"})))?;
                Err::<(), _>(DataError::Internal("abort".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(count_users(&client).await, Some(0));
    }

    #[tokio::test]
    async fn recovered_error_leaves_no_partial_write() {
        let client = client().await;
        client
            .transaction(|tx| {
                let failed = tx.user().create(CreateArgs::new(json!({
                    "email": "half@x.com",
                    "videos": {"create": {"prompt": "p", "duration": 5, "style": "EXPLAINER", "tokensUsed": -5}}
                })));
                assert!(failed.is_err());
                tx.user().create(CreateArgs::new(json!({"email": "whole@x.com"})))?;
                Ok(())
            })
            .await
            .unwrap();
        let emails: Vec<_> = client
            .user()
            .find_many(FindManyArgs::default())
            .await
            .unwrap()
            .into_iter()
            .filter_map(|u| u.get("email").and_then(|v| v.as_str()).map(String::from))
            .collect();
        assert_eq!(emails, ["whole@x.com"]);
    }

    #[tokio::test]
    async fn slow_callback_expires_and_rolls_back() {
        let client = client().await;
        let options = TransactionOptions {
            timeout: Duration::from_millis(20),
            ..TransactionOptions::default()
        };
        let err = client
            .transaction_with(options, |tx| {
                tx.user().create(CreateArgs::new(json!({"email": "late@x.com"})))?;
                std::thread::sleep(Duration::from_millis(60));
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionExpired);
        assert_eq!(count_users(&client).await, Some(0));
    }

    #[tokio::test]
    async fn queued_past_max_wait_fails_to_start() {
        let client = client().await;
        let blocker = client.clone();
        let busy = tokio::spawn(async move {
            blocker
                .transaction(|_| {
                    std::thread::sleep(Duration::from_millis(150));
                    Ok(())
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        let options = TransactionOptions {
            max_wait: Duration::from_millis(10),
            ..TransactionOptions::default()
        };
        let err = client.transaction_with(options, |_| Ok(())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionStartTimeout);
        busy.await.unwrap().unwrap();
    }

    #[test]
    fn isolation_levels_map_to_lock_modes() {
        assert!(takes_write_lock(IsolationLevel::Serializable));
        assert!(takes_write_lock(IsolationLevel::RepeatableRead));
        assert!(!takes_write_lock(IsolationLevel::ReadCommitted));
        assert!(!takes_write_lock(IsolationLevel::ReadUncommitted));
    }
}
