// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operations as values, and their compilation into executable plans.
//!
//! Compiling validates every filter, payload and projection against the
//! schema, so a malformed operation fails before any storage call.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};
use tracing::trace;

use crate::error::DataError;
use crate::query::aggregate::{AggregateResult, AggregateSpec, COUNT_ALL};
use crate::query::args::{
    AggregateArgs, CountArgs, CreateArgs, CreateManyArgs, DeleteArgs, DeleteManyArgs,
    FindManyArgs, FindUniqueArgs, GroupByArgs, UpdateArgs, UpdateManyArgs, UpsertArgs,
};
use crate::query::data::{CreateInput, UpdateInput};
use crate::query::filter::Filter;
use crate::query::group_by::{GroupByPlan, GroupRow};
use crate::query::pipeline::FindQuery;
use crate::query::selection::Selection;
use crate::record::ShapedRecord;
use crate::schema::{Entity, EntitySchema, SchemaRegistry};
use crate::types::BatchPayload;
use crate::value::json_kind;

/// One operation on one entity.
#[derive(Debug, Clone)]
pub struct Operation {
    pub entity: Entity,
    pub action: Action,
}

impl Operation {
    pub fn new(entity: Entity, action: Action) -> Self {
        Self { entity, action }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    FindUnique(FindUniqueArgs),
    FindUniqueOrThrow(FindUniqueArgs),
    FindFirst(FindManyArgs),
    FindFirstOrThrow(FindManyArgs),
    FindMany(FindManyArgs),
    Create(CreateArgs),
    CreateMany(CreateManyArgs),
    Update(UpdateArgs),
    UpdateMany(UpdateManyArgs),
    Upsert(UpsertArgs),
    Delete(DeleteArgs),
    DeleteMany(DeleteManyArgs),
    Aggregate(AggregateArgs),
    GroupBy(GroupByArgs),
    Count(CountArgs),
}

impl Action {
    /// Operation name as callers spell it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FindUnique(_) => "findUnique",
            Self::FindUniqueOrThrow(_) => "findUniqueOrThrow",
            Self::FindFirst(_) => "findFirst",
            Self::FindFirstOrThrow(_) => "findFirstOrThrow",
            Self::FindMany(_) => "findMany",
            Self::Create(_) => "create",
            Self::CreateMany(_) => "createMany",
            Self::Update(_) => "update",
            Self::UpdateMany(_) => "updateMany",
            Self::Upsert(_) => "upsert",
            Self::Delete(_) => "delete",
            Self::DeleteMany(_) => "deleteMany",
            Self::Aggregate(_) => "aggregate",
            Self::GroupBy(_) => "groupBy",
            Self::Count(_) => "count",
        }
    }
}

/// Which columns `count` reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSelect {
    pub all: bool,
    pub fields: Vec<String>,
}

/// A validated operation, ready for a backend to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    FindUnique {
        filter: Filter,
        selection: Selection,
        or_throw: bool,
    },
    FindMany {
        query: FindQuery,
        selection: Selection,
        /// `findFirst`: return only the first row.
        first: bool,
        or_throw: bool,
    },
    Create {
        input: CreateInput,
        selection: Selection,
    },
    CreateMany {
        inputs: Vec<CreateInput>,
        skip_duplicates: bool,
    },
    Update {
        filter: Filter,
        input: UpdateInput,
        selection: Selection,
    },
    UpdateMany {
        filter: Option<Filter>,
        input: UpdateInput,
        limit: Option<u64>,
    },
    Upsert {
        filter: Filter,
        create: CreateInput,
        update: UpdateInput,
        selection: Selection,
    },
    Delete {
        filter: Filter,
        selection: Selection,
    },
    DeleteMany {
        filter: Option<Filter>,
        limit: Option<u64>,
    },
    Aggregate {
        query: FindQuery,
        spec: AggregateSpec,
    },
    GroupBy(GroupByPlan),
    Count {
        query: FindQuery,
        select: Option<CountSelect>,
    },
}

impl Plan {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Create { .. }
                | Self::CreateMany { .. }
                | Self::Update { .. }
                | Self::UpdateMany { .. }
                | Self::Upsert { .. }
                | Self::Delete { .. }
                | Self::DeleteMany { .. }
        )
    }
}

/// An operation after compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOperation {
    pub entity: Entity,
    pub action: &'static str,
    pub plan: Plan,
}

impl CompiledOperation {
    pub fn is_write(&self) -> bool {
        self.plan.is_write()
    }
}

/// Compiles `op` against the registry.
pub fn compile(registry: &SchemaRegistry, op: &Operation) -> Result<CompiledOperation, DataError> {
    let schema = registry.get(op.entity);
    let action = op.action.name();
    trace!(entity = %op.entity, action, "compiling operation");
    let plan = match &op.action {
        Action::FindUnique(args) | Action::FindUniqueOrThrow(args) => Plan::FindUnique {
            filter: Filter::parse_unique(registry, schema, &args.filter, action)?,
            selection: Selection::parse(registry, schema, args.projection())?,
            or_throw: matches!(op.action, Action::FindUniqueOrThrow(_)),
        },
        Action::FindFirst(args) | Action::FindFirstOrThrow(args) | Action::FindMany(args) => {
            Plan::FindMany {
                query: FindQuery::compile(registry, schema, args.query_parts())?,
                selection: Selection::parse(registry, schema, args.projection())?,
                first: !matches!(op.action, Action::FindMany(_)),
                or_throw: matches!(op.action, Action::FindFirstOrThrow(_)),
            }
        }
        Action::Create(args) => Plan::Create {
            input: CreateInput::parse(registry, schema, &args.data, None)?,
            selection: Selection::parse(registry, schema, args.projection())?,
        },
        Action::CreateMany(args) => {
            let rows: Vec<&JsonValue> = match &args.data {
                JsonValue::Array(items) => items.iter().collect(),
                JsonValue::Object(_) => vec![&args.data],
                other => {
                    return Err(DataError::shape(
                        schema.name(),
                        format!("createMany data must be an object or array, found {}", json_kind(other)),
                    ));
                }
            };
            let inputs = rows
                .into_iter()
                .map(|row| CreateInput::parse(registry, schema, row, None))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(nested) = inputs.iter().find(|i| !i.nested.is_empty() || !i.connects.is_empty()) {
                let relation = nested
                    .nested
                    .first()
                    .map(|(r, _)| r.name)
                    .or_else(|| nested.connects.first().map(|(r, _)| r.name))
                    .unwrap_or_default();
                return Err(DataError::shape(
                    schema.name(),
                    format!("createMany takes scalar data only; `{relation}` is a relation"),
                ));
            }
            Plan::CreateMany {
                inputs,
                skip_duplicates: args.skip_duplicates,
            }
        }
        Action::Update(args) => Plan::Update {
            filter: Filter::parse_unique(registry, schema, &args.filter, action)?,
            input: UpdateInput::parse(registry, schema, &args.data)?,
            selection: Selection::parse(registry, schema, args.projection())?,
        },
        Action::UpdateMany(args) => {
            let input = UpdateInput::parse(registry, schema, &args.data)?;
            if !input.relations.is_empty() {
                return Err(DataError::shape(
                    schema.name(),
                    "updateMany takes scalar data only",
                ));
            }
            Plan::UpdateMany {
                filter: optional_filter(registry, schema, args.filter.as_ref())?,
                input,
                limit: args.limit,
            }
        }
        Action::Upsert(args) => Plan::Upsert {
            filter: Filter::parse_unique(registry, schema, &args.filter, action)?,
            create: CreateInput::parse(registry, schema, &args.create, None)?,
            update: UpdateInput::parse(registry, schema, &args.update)?,
            selection: Selection::parse(registry, schema, args.projection())?,
        },
        Action::Delete(args) => Plan::Delete {
            filter: Filter::parse_unique(registry, schema, &args.filter, action)?,
            selection: Selection::parse(registry, schema, args.projection())?,
        },
        Action::DeleteMany(args) => Plan::DeleteMany {
            filter: optional_filter(registry, schema, args.filter.as_ref())?,
            limit: args.limit,
        },
        Action::Aggregate(args) => Plan::Aggregate {
            query: FindQuery::compile(registry, schema, args.query_parts())?,
            spec: AggregateSpec::parse(schema, &args.aggregates)?,
        },
        Action::GroupBy(args) => Plan::GroupBy(GroupByPlan::parse(registry, schema, args)?),
        Action::Count(args) => Plan::Count {
            query: FindQuery::compile(registry, schema, args.query_parts())?,
            select: args
                .select
                .as_ref()
                .map(|s| parse_count_select(schema, s))
                .transpose()?,
        },
    };
    Ok(CompiledOperation {
        entity: op.entity,
        action,
        plan,
    })
}

fn optional_filter(
    registry: &SchemaRegistry,
    schema: &EntitySchema,
    filter: Option<&JsonValue>,
) -> Result<Option<Filter>, DataError> {
    filter.map(|f| Filter::parse(registry, schema, f)).transpose()
}

fn parse_count_select(schema: &EntitySchema, input: &JsonValue) -> Result<CountSelect, DataError> {
    let obj = input.as_object().ok_or_else(|| {
        DataError::shape(
            schema.name(),
            format!("count select must be an object, found {}", json_kind(input)),
        )
    })?;
    let mut select = CountSelect {
        all: false,
        fields: Vec::new(),
    };
    for (key, flag) in obj {
        let on = flag.as_bool().ok_or_else(|| {
            DataError::shape(schema.name(), format!("`{key}` takes true or false"))
        })?;
        if !on {
            continue;
        }
        if key == COUNT_ALL {
            select.all = true;
        } else {
            select.fields.push(schema.require_field(key)?.name.to_string());
        }
    }
    Ok(select)
}

/// Result of `count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountResult {
    Total(u64),
    /// Non-null counts per field, plus `_all` when requested.
    Fields(BTreeMap<String, u64>),
}

impl CountResult {
    /// The plain total, or `_all` when fields were selected.
    pub fn total(&self) -> Option<u64> {
        match self {
            Self::Total(n) => Some(*n),
            Self::Fields(fields) => fields.get(COUNT_ALL).copied(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Total(n) => JsonValue::from(*n),
            Self::Fields(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), JsonValue::from(*v)))
                    .collect(),
            ),
        }
    }
}

/// Output of any operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    Record(ShapedRecord),
    MaybeRecord(Option<ShapedRecord>),
    Records(Vec<ShapedRecord>),
    Batch(BatchPayload),
    Aggregate(AggregateResult),
    Groups(Vec<GroupRow>),
    Count(CountResult),
}

impl OperationOutput {
    fn unexpected(&self, wanted: &str) -> DataError {
        DataError::Internal(format!("expected {wanted} output, got {}", self.kind()))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::MaybeRecord(_) => "optional record",
            Self::Records(_) => "record list",
            Self::Batch(_) => "batch",
            Self::Aggregate(_) => "aggregate",
            Self::Groups(_) => "group list",
            Self::Count(_) => "count",
        }
    }

    pub fn into_record(self) -> Result<ShapedRecord, DataError> {
        match self {
            Self::Record(r) => Ok(r),
            other => Err(other.unexpected("record")),
        }
    }

    pub fn into_optional(self) -> Result<Option<ShapedRecord>, DataError> {
        match self {
            Self::MaybeRecord(r) => Ok(r),
            Self::Record(r) => Ok(Some(r)),
            other => Err(other.unexpected("optional record")),
        }
    }

    pub fn into_records(self) -> Result<Vec<ShapedRecord>, DataError> {
        match self {
            Self::Records(r) => Ok(r),
            other => Err(other.unexpected("record list")),
        }
    }

    pub fn into_batch(self) -> Result<BatchPayload, DataError> {
        match self {
            Self::Batch(b) => Ok(b),
            other => Err(other.unexpected("batch")),
        }
    }

    pub fn into_aggregate(self) -> Result<AggregateResult, DataError> {
        match self {
            Self::Aggregate(a) => Ok(a),
            other => Err(other.unexpected("aggregate")),
        }
    }

    pub fn into_groups(self) -> Result<Vec<GroupRow>, DataError> {
        match self {
            Self::Groups(g) => Ok(g),
            other => Err(other.unexpected("group list")),
        }
    }

    pub fn into_count(self) -> Result<CountResult, DataError> {
        match self {
            Self::Count(c) => Ok(c),
            other => Err(other.unexpected("count")),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Record(r) => r.to_json(),
            Self::MaybeRecord(r) => r.as_ref().map_or(JsonValue::Null, ShapedRecord::to_json),
            Self::Records(rs) => JsonValue::Array(rs.iter().map(ShapedRecord::to_json).collect()),
            Self::Batch(b) => {
                let mut obj = Map::new();
                obj.insert("count".into(), JsonValue::from(b.count));
                JsonValue::Object(obj)
            }
            Self::Aggregate(a) => a.to_json(),
            Self::Groups(gs) => JsonValue::Array(gs.iter().map(GroupRow::to_json).collect()),
            Self::Count(c) => c.to_json(),
        }
    }
}
