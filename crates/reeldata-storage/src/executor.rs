// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous plan executor.
//!
//! An [`Executor`] borrows a connection that is already inside a transaction
//! and runs compiled plans against it. Candidate rows are fetched with any
//! top-level equalities pushed down into SQL; the full filter, ordering and
//! pagination are then applied by the query pipeline. Writes go through the
//! invariant checks and a foreign-key pre-check before touching the table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reeldata_core::query::{CountResult, CountSelect, CreateInput, Filter, RelationWrite, UpdateInput};
use reeldata_core::rules::{self, WriteKind};
use reeldata_core::schema::{EntitySchema, RelationDef, ScalarType};
use reeldata_core::value::now_millis;
use reeldata_core::{
    BatchPayload, CompiledOperation, DataError, OperationOutput, Plan, Record, RelationResolver, SchemaRegistry,
    Shaper, Value,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{ffi, params_from_iter, Connection, Transaction, TransactionBehavior};
use tracing::{debug, trace};

use crate::codec::{column_list, quote, read_record, to_sql};

/// Starts a transaction: `IMMEDIATE` takes the write lock up front.
pub(crate) fn begin(conn: &mut Connection, write: bool) -> Result<Transaction<'_>, DataError> {
    let behavior = if write {
        TransactionBehavior::Immediate
    } else {
        TransactionBehavior::Deferred
    };
    conn.transaction_with_behavior(behavior)
        .map_err(DataError::storage)
}

pub struct Executor<'c> {
    conn: &'c Connection,
    registry: &'c SchemaRegistry,
    now: DateTime<Utc>,
}

impl<'c> Executor<'c> {
    pub fn new(conn: &'c Connection, registry: &'c SchemaRegistry) -> Self {
        Self {
            conn,
            registry,
            now: now_millis(),
        }
    }

    pub fn execute(&self, op: &CompiledOperation) -> Result<OperationOutput, DataError> {
        debug!(entity = %op.entity, action = op.action, "dispatching operation");
        let schema = self.registry.get(op.entity);
        let shaper = Shaper::new(self.registry, self);
        let not_found = || DataError::NotFound {
            entity: schema.name(),
            operation: op.action.to_string(),
        };

        let output = match &op.plan {
            Plan::FindUnique {
                filter,
                selection,
                or_throw,
            } => match self.find_unique(schema, filter)? {
                Some(row) => {
                    let shaped = shaper.shape(op.entity, &row, selection)?;
                    if *or_throw {
                        OperationOutput::Record(shaped)
                    } else {
                        OperationOutput::MaybeRecord(Some(shaped))
                    }
                }
                None if *or_throw => return Err(not_found()),
                None => OperationOutput::MaybeRecord(None),
            },
            Plan::FindMany {
                query,
                selection,
                first,
                or_throw,
            } => {
                let rows = query.run(self.candidates(schema, query.filter.as_ref())?, self)?;
                if *first {
                    match rows.first() {
                        Some(row) if *or_throw => OperationOutput::Record(shaper.shape(op.entity, row, selection)?),
                        Some(row) => OperationOutput::MaybeRecord(Some(shaper.shape(op.entity, row, selection)?)),
                        None if *or_throw => return Err(not_found()),
                        None => OperationOutput::MaybeRecord(None),
                    }
                } else {
                    OperationOutput::Records(shaper.shape_all(op.entity, &rows, selection)?)
                }
            }
            Plan::Create { input, selection } => {
                let row = self.create(input)?;
                OperationOutput::Record(shaper.shape(op.entity, &row, selection)?)
            }
            Plan::CreateMany {
                inputs,
                skip_duplicates,
            } => {
                let mut count = 0;
                for input in inputs {
                    let row = input.build_record(schema, self.now)?;
                    rules::check(op.entity, &row, WriteKind::Create, self.now)?;
                    self.check_foreign_keys(schema, &row, None)?;
                    if self.insert(schema, &row, *skip_duplicates)? {
                        count += 1;
                    }
                }
                OperationOutput::Batch(BatchPayload { count })
            }
            Plan::Update {
                filter,
                input,
                selection,
            } => {
                let current = self.find_unique(schema, filter)?.ok_or_else(not_found)?;
                let row = self.update(schema, &current, input)?;
                OperationOutput::Record(shaper.shape(op.entity, &row, selection)?)
            }
            Plan::UpdateMany {
                filter,
                input,
                limit,
            } => {
                let rows = self.matching(schema, filter.as_ref(), *limit)?;
                for row in &rows {
                    self.update(schema, row, input)?;
                }
                OperationOutput::Batch(batch(rows.len()))
            }
            Plan::Upsert {
                filter,
                create,
                update,
                selection,
            } => {
                let row = match self.find_unique(schema, filter)? {
                    Some(current) => self.update(schema, &current, update)?,
                    None => self.create(create)?,
                };
                OperationOutput::Record(shaper.shape(op.entity, &row, selection)?)
            }
            Plan::Delete { filter, selection } => {
                let current = self.find_unique(schema, filter)?.ok_or_else(not_found)?;
                let shaped = shaper.shape(op.entity, &current, selection)?;
                self.delete(schema, &current)?;
                OperationOutput::Record(shaped)
            }
            Plan::DeleteMany { filter, limit } => {
                let rows = self.matching(schema, filter.as_ref(), *limit)?;
                for row in &rows {
                    self.delete(schema, row)?;
                }
                OperationOutput::Batch(batch(rows.len()))
            }
            Plan::Aggregate { query, spec } => {
                let rows = query.run(self.candidates(schema, query.filter.as_ref())?, self)?;
                OperationOutput::Aggregate(spec.compute(&rows)?)
            }
            Plan::GroupBy(plan) => {
                let rows = self.candidates(schema, plan.filter.as_ref())?;
                OperationOutput::Groups(plan.run(rows, self)?)
            }
            Plan::Count { query, select } => {
                let rows = query.run(self.candidates(schema, query.filter.as_ref())?, self)?;
                OperationOutput::Count(count_rows(&rows, select.as_ref()))
            }
        };
        Ok(output)
    }

    /// Rows that may match `filter`, in insertion order. Only equalities whose
    /// stored text has a single spelling are pushed down; decimals, JSON and
    /// timestamps can be written in more than one form. Callers still apply
    /// the filter.
    fn candidates(&self, schema: &EntitySchema, filter: Option<&Filter>) -> Result<Vec<Record>, DataError> {
        let mut clauses = Vec::new();
        if let Some(filter) = filter {
            for (name, value) in filter.equalities() {
                let Some(field) = schema.field(name) else { continue };
                if matches!(field.ty, ScalarType::Decimal | ScalarType::Json | ScalarType::DateTime) {
                    continue;
                }
                clauses.push((field.column, to_sql(value)?));
            }
        }
        self.select_where(schema, &clauses)
    }

    fn matching(
        &self,
        schema: &EntitySchema,
        filter: Option<&Filter>,
        limit: Option<u64>,
    ) -> Result<Vec<Record>, DataError> {
        let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let mut rows = Vec::new();
        for row in self.candidates(schema, filter)? {
            if rows.len() >= limit {
                break;
            }
            let keep = match filter {
                Some(f) => f.matches(&row, self)?,
                None => true,
            };
            if keep {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn find_unique(&self, schema: &EntitySchema, filter: &Filter) -> Result<Option<Record>, DataError> {
        for row in self.candidates(schema, Some(filter))? {
            if filter.matches(&row, self)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn select_where(
        &self,
        schema: &EntitySchema,
        clauses: &[(&str, SqlValue)],
    ) -> Result<Vec<Record>, DataError> {
        let mut sql = format!("SELECT {} FROM {}", column_list(schema), quote(schema.table));
        if !clauses.is_empty() {
            let conditions: Vec<String> = clauses
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("{} = ?{}", quote(column), i + 1))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY rowid");
        trace!(%sql, "select");

        let mut stmt = self.conn.prepare_cached(&sql).map_err(DataError::storage)?;
        let mut rows = stmt
            .query(params_from_iter(clauses.iter().map(|(_, v)| v)))
            .map_err(DataError::storage)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(DataError::storage)? {
            records.push(read_record(schema, row)?);
        }
        Ok(records)
    }

    fn create(&self, input: &CreateInput) -> Result<Record, DataError> {
        let schema = self.registry.get(input.entity);
        let mut values = input.values.clone();
        for (relation, filter) in &input.connects {
            let target = self.connect_target(schema, relation, filter)?;
            values.insert(relation.local_field.to_string(), target);
        }
        let scalars = CreateInput {
            entity: input.entity,
            values,
            connects: Vec::new(),
            nested: Vec::new(),
        };
        let row = scalars.build_record(schema, self.now)?;
        rules::check(input.entity, &row, WriteKind::Create, self.now)?;
        self.check_foreign_keys(schema, &row, None)?;
        self.insert(schema, &row, false)?;

        for (relation, children) in &input.nested {
            let parent_key = row.get(relation.local_field).clone();
            for child in children {
                let mut child = child.clone();
                child
                    .values
                    .insert(relation.foreign_field.to_string(), parent_key.clone());
                self.create(&child)?;
            }
        }
        Ok(row)
    }

    fn update(&self, schema: &EntitySchema, current: &Record, input: &UpdateInput) -> Result<Record, DataError> {
        let mut next = input.apply(schema, current, self.now)?;
        for (relation, write) in &input.relations {
            let value = match write {
                RelationWrite::Connect(filter) => self.connect_target(schema, relation, filter)?,
                RelationWrite::Disconnect => Value::Null,
            };
            next.set(relation.local_field, value);
        }
        rules::check(schema.entity, &next, WriteKind::Update, self.now)?;
        self.check_foreign_keys(schema, &next, Some(current))?;

        let assignments: Vec<&str> = schema.fields.iter().filter(|f| !f.id).map(|f| f.column).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ?{}",
            quote(schema.table),
            assignments
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} = ?{}", quote(c), i + 1))
                .collect::<Vec<_>>()
                .join(", "),
            assignments.len() + 1
        );
        let mut params = schema
            .fields
            .iter()
            .filter(|f| !f.id)
            .map(|f| to_sql(next.get(f.name)))
            .collect::<Result<Vec<_>, _>>()?;
        params.push(SqlValue::Text(current.id().to_string()));
        trace!(%sql, "update");
        self.conn
            .prepare_cached(&sql)
            .and_then(|mut stmt| stmt.execute(params_from_iter(params)))
            .map_err(|e| map_constraint_error(schema, e))?;
        Ok(next)
    }

    /// Inserts `row`; with `skip_duplicates` a unique collision is skipped and
    /// reported as `false`.
    fn insert(&self, schema: &EntitySchema, row: &Record, skip_duplicates: bool) -> Result<bool, DataError> {
        let placeholders: Vec<String> = (1..=schema.fields.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}){}",
            quote(schema.table),
            column_list(schema),
            placeholders.join(", "),
            if skip_duplicates { " ON CONFLICT DO NOTHING" } else { "" }
        );
        let params = schema
            .fields
            .iter()
            .map(|f| to_sql(row.get(f.name)))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(%sql, "insert");
        let changed = self
            .conn
            .prepare_cached(&sql)
            .and_then(|mut stmt| stmt.execute(params_from_iter(params)))
            .map_err(|e| map_constraint_error(schema, e))?;
        Ok(changed > 0)
    }

    fn delete(&self, schema: &EntitySchema, row: &Record) -> Result<(), DataError> {
        let sql = format!("DELETE FROM {} WHERE \"id\" = ?1", quote(schema.table));
        self.conn
            .prepare_cached(&sql)
            .and_then(|mut stmt| stmt.execute([row.id()]))
            .map_err(|e| map_constraint_error(schema, e))?;
        Ok(())
    }

    /// Resolves a `connect` filter to the key value stored in the foreign key.
    fn connect_target(
        &self,
        schema: &EntitySchema,
        relation: &RelationDef,
        filter: &Filter,
    ) -> Result<Value, DataError> {
        let target = self.registry.get(relation.target);
        match self.find_unique(target, filter)? {
            Some(row) => Ok(row.get(relation.foreign_field).clone()),
            None => Err(DataError::ForeignKeyViolation {
                entity: schema.name(),
                field: relation.local_field.to_string(),
            }),
        }
    }

    /// Verifies every non-null foreign key of `row` references an existing
    /// record. Keys unchanged from `previous` are not rechecked.
    fn check_foreign_keys(
        &self,
        schema: &EntitySchema,
        row: &Record,
        previous: Option<&Record>,
    ) -> Result<(), DataError> {
        for relation in schema.relations.iter().filter(|r| r.owning) {
            let key = row.get(relation.local_field);
            if key.is_null() || previous.is_some_and(|p| p.get(relation.local_field) == key) {
                continue;
            }
            let target = self.registry.get(relation.target);
            let column = target.require_field(relation.foreign_field)?.column;
            let sql = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
                quote(target.table),
                quote(column)
            );
            let exists: bool = self
                .conn
                .query_row(&sql, [to_sql(key)?], |r| r.get(0))
                .map_err(DataError::storage)?;
            if !exists {
                return Err(DataError::ForeignKeyViolation {
                    entity: schema.name(),
                    field: relation.local_field.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl RelationResolver for Executor<'_> {
    fn load_related(&self, relation: &RelationDef, record: &Record) -> Result<Vec<Record>, DataError> {
        let key = record.get(relation.local_field);
        if key.is_null() {
            return Ok(Vec::new());
        }
        let target = self.registry.get(relation.target);
        let column = target.require_field(relation.foreign_field)?.column;
        self.select_where(target, &[(column, to_sql(key)?)])
    }
}

/// Maps SQLite constraint failures to the matching error kind; anything else
/// is passed through as `Storage`.
pub(crate) fn map_constraint_error(schema: &EntitySchema, e: rusqlite::Error) -> DataError {
    if let rusqlite::Error::SqliteFailure(err, message) = &e {
        match err.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return DataError::UniqueConstraintViolation {
                    entity: schema.name(),
                    fields: unique_fields_from_message(schema, message.as_deref().unwrap_or_default()),
                };
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                let field = schema
                    .relations
                    .iter()
                    .find(|r| r.owning)
                    .map_or("", |r| r.local_field);
                return DataError::ForeignKeyViolation {
                    entity: schema.name(),
                    field: field.to_string(),
                };
            }
            _ => {}
        }
    }
    DataError::storage(e)
}

/// `UNIQUE constraint failed: users.email` yields `["email"]`.
fn unique_fields_from_message(schema: &EntitySchema, message: &str) -> Vec<String> {
    let Some((_, columns)) = message.split_once("failed: ") else {
        return Vec::new();
    };
    columns
        .split(", ")
        .map(|qualified| {
            let column = qualified.rsplit('.').next().unwrap_or(qualified).trim();
            schema
                .field_by_column(column)
                .map_or_else(|| column.to_string(), |f| f.name.to_string())
        })
        .collect()
}

fn batch(n: usize) -> BatchPayload {
    BatchPayload {
        count: u64::try_from(n).unwrap_or(u64::MAX),
    }
}

fn count_rows(rows: &[Record], select: Option<&CountSelect>) -> CountResult {
    let total = u64::try_from(rows.len()).unwrap_or(u64::MAX);
    let Some(select) = select else {
        return CountResult::Total(total);
    };
    let mut fields = BTreeMap::new();
    if select.all {
        fields.insert(reeldata_core::query::aggregate::COUNT_ALL.to_string(), total);
    }
    for field in &select.fields {
        let n = rows.iter().filter(|r| !r.get(field).is_null()).count();
        fields.insert(field.clone(), u64::try_from(n).unwrap_or(u64::MAX));
    }
    CountResult::Fields(fields)
}
