// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `groupBy` with `having` and aggregate ordering.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};

use crate::error::DataError;
use crate::query::aggregate::{AggregateFn, AggregateResult, AggregateSpec};
use crate::query::args::GroupByArgs;
use crate::query::filter::{parse_scalar_condition, Filter, ScalarCondition};
use crate::query::order::{parse_direction, single_entry, NullsOrder, OrderBy, SortOrder};
use crate::query::pipeline::{fingerprint, paginate};
use crate::record::Record;
use crate::schema::{EntitySchema, FieldDef, ScalarType, SchemaRegistry};
use crate::traits::RelationResolver;
use crate::value::{json_kind, Value};

/// Post-aggregation predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Having {
    And(Vec<Having>),
    Or(Vec<Having>),
    Not(Vec<Having>),
    /// Condition on a grouping key.
    Key {
        field: String,
        condition: ScalarCondition,
    },
    /// Condition on an aggregate of the group's rows.
    Aggregate {
        func: AggregateFn,
        field: String,
        condition: ScalarCondition,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupOrder {
    Key(OrderBy),
    Aggregate {
        func: AggregateFn,
        field: String,
        order: SortOrder,
    },
}

/// One output group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub keys: Vec<(String, Value)>,
    pub aggregates: AggregateResult,
}

impl GroupRow {
    pub fn key(&self, field: &str) -> Option<&Value> {
        self.keys.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        for (k, v) in &self.keys {
            obj.insert(k.clone(), v.to_json());
        }
        self.aggregates.write_json(&mut obj);
        JsonValue::Object(obj)
    }
}

/// A compiled `groupBy`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByPlan {
    pub by: Vec<String>,
    pub filter: Option<Filter>,
    pub having: Option<Having>,
    pub order: Vec<GroupOrder>,
    pub take: Option<i64>,
    pub skip: Option<u64>,
    pub aggregates: AggregateSpec,
}

struct Group {
    keys: Vec<(String, Value)>,
    rows: Vec<Record>,
}

impl GroupByPlan {
    pub fn parse(
        registry: &SchemaRegistry,
        schema: &EntitySchema,
        args: &GroupByArgs,
    ) -> Result<Self, DataError> {
        let by = parse_by(schema, &args.by)?;
        let filter = args
            .filter
            .as_ref()
            .map(|f| Filter::parse(registry, schema, f))
            .transpose()?;
        let having = args
            .having
            .as_ref()
            .map(|h| parse_having(schema, &by, h))
            .transpose()?;
        let order = args
            .order_by
            .as_ref()
            .map(|o| parse_group_order(schema, &by, o))
            .transpose()?
            .unwrap_or_default();
        let aggregates = AggregateSpec::parse(schema, &args.aggregates)?;
        Ok(Self {
            by,
            filter,
            having,
            order,
            take: args.take,
            skip: args.skip,
            aggregates,
        })
    }

    pub fn run(
        &self,
        rows: Vec<Record>,
        resolver: &dyn RelationResolver,
    ) -> Result<Vec<GroupRow>, DataError> {
        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in rows {
            if let Some(filter) = &self.filter {
                if !filter.matches(&row, resolver)? {
                    continue;
                }
            }
            let keys: Vec<(String, Value)> = self
                .by
                .iter()
                .map(|f| (f.clone(), row.get(f).clone()))
                .collect();
            let fp = keys
                .iter()
                .map(|(_, v)| fingerprint(v))
                .collect::<Vec<_>>()
                .join("\u{1f}");
            let slot = *index.entry(fp).or_insert_with(|| {
                groups.push(Group {
                    keys,
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].rows.push(row);
        }

        let mut kept = Vec::with_capacity(groups.len());
        for group in groups {
            let keep = match &self.having {
                Some(having) => having.eval(&group)? == Some(true),
                None => true,
            };
            if keep {
                kept.push(group);
            }
        }

        if !self.order.is_empty() {
            let mut keyed = Vec::with_capacity(kept.len());
            for group in kept {
                let sort_values = self
                    .order
                    .iter()
                    .map(|o| match o {
                        GroupOrder::Key(ob) => Ok(group_key(&group, &ob.field).clone()),
                        GroupOrder::Aggregate { func, field, .. } => func.compute(field, &group.rows),
                    })
                    .collect::<Result<Vec<_>, DataError>>()?;
                keyed.push((sort_values, group));
            }
            keyed.sort_by(|(a, _), (b, _)| {
                self.order
                    .iter()
                    .zip(a.iter().zip(b))
                    .map(|(o, (x, y))| match o {
                        GroupOrder::Key(ob) => ob.compare_values(x, y),
                        GroupOrder::Aggregate { order, .. } => {
                            let ob = OrderBy {
                                field: String::new(),
                                order: *order,
                                nulls: None,
                            };
                            ob.compare_values(x, y)
                        }
                    })
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
            kept = keyed.into_iter().map(|(_, g)| g).collect();
        }

        let window = paginate(kept, None, self.take, self.skip);
        window
            .into_iter()
            .map(|group| {
                Ok(GroupRow {
                    aggregates: self.aggregates.compute(&group.rows)?,
                    keys: group.keys,
                })
            })
            .collect()
    }
}

fn group_key<'a>(group: &'a Group, field: &str) -> &'a Value {
    group
        .keys
        .iter()
        .find(|(k, _)| k == field)
        .map_or(&Value::Null, |(_, v)| v)
}

impl Having {
    fn eval(&self, group: &Group) -> Result<Option<bool>, DataError> {
        Ok(match self {
            Self::And(parts) => {
                let mut acc = Some(true);
                for p in parts {
                    acc = match (acc, p.eval(group)?) {
                        (Some(false), _) | (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    };
                }
                acc
            }
            Self::Or(parts) => {
                let mut acc = Some(false);
                for p in parts {
                    acc = match (acc, p.eval(group)?) {
                        (Some(true), _) | (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    };
                }
                acc
            }
            Self::Not(parts) => {
                let mut acc = Some(true);
                for p in parts {
                    acc = match (acc, p.eval(group)?.map(|b| !b)) {
                        (Some(false), _) | (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    };
                }
                acc
            }
            Self::Key { field, condition } => condition.eval(group_key(group, field)),
            Self::Aggregate {
                func,
                field,
                condition,
            } => condition.eval(&func.compute(field, &group.rows)?),
        })
    }
}

fn parse_by(schema: &EntitySchema, by: &JsonValue) -> Result<Vec<String>, DataError> {
    let names: Vec<&JsonValue> = match by {
        JsonValue::Array(items) => items.iter().collect(),
        JsonValue::Null => Vec::new(),
        single => vec![single],
    };
    if names.is_empty() {
        return Err(DataError::EmptyGroupByKey {
            entity: schema.name(),
        });
    }
    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_str().ok_or_else(|| {
            DataError::shape(
                schema.name(),
                format!("by takes field names, found {}", json_kind(name)),
            )
        })?;
        let field = schema.require_field(name)?;
        if field.ty == ScalarType::Json {
            return Err(DataError::mismatch(
                schema.name(),
                field.name,
                "a groupable field",
                "Json",
            ));
        }
        if !fields.iter().any(|f| f == field.name) {
            fields.push(field.name.to_string());
        }
    }
    Ok(fields)
}

fn parse_having(schema: &EntitySchema, by: &[String], input: &JsonValue) -> Result<Having, DataError> {
    let obj = input.as_object().ok_or_else(|| {
        DataError::shape(
            schema.name(),
            format!("having must be an object, found {}", json_kind(input)),
        )
    })?;
    let list = |value: &JsonValue| -> Result<Vec<Having>, DataError> {
        match value {
            JsonValue::Array(items) => items.iter().map(|i| parse_having(schema, by, i)).collect(),
            other => Ok(vec![parse_having(schema, by, other)?]),
        }
    };
    let mut parts = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        match key.as_str() {
            "AND" => parts.push(Having::And(list(value)?)),
            "OR" => parts.push(Having::Or(list(value)?)),
            "NOT" => parts.push(Having::Not(list(value)?)),
            name => {
                let field = schema.require_field(name)?;
                parts.extend(parse_having_field(schema, by, field, value)?);
            }
        }
    }
    Ok(match parts.len() {
        1 => parts.remove(0),
        _ => Having::And(parts),
    })
}

fn parse_having_field(
    schema: &EntitySchema,
    by: &[String],
    field: &FieldDef,
    value: &JsonValue,
) -> Result<Vec<Having>, DataError> {
    let aggregate_keys = value
        .as_object()
        .map(|obj| obj.keys().filter(|k| k.starts_with('_')).count())
        .unwrap_or(0);
    if let (Some(obj), true) = (value.as_object(), aggregate_keys > 0) {
        if aggregate_keys != obj.len() {
            return Err(DataError::shape(
                schema.name(),
                format!("having on `{}` mixes aggregate and plain conditions", field.name),
            ));
        }
        let mut parts = Vec::with_capacity(obj.len());
        for (key, cond) in obj {
            let func = AggregateFn::from_str(key).map_err(|_| {
                DataError::shape(schema.name(), format!("unknown aggregate `{key}` in having"))
            })?;
            func.validate(schema, field)?;
            let result_field = FieldDef::new(field.name, field.column, func.result_type(field)).optional();
            let condition = match cond {
                JsonValue::Object(ops) => parse_scalar_condition(schema, &result_field, ops)?,
                direct => {
                    let mut ops = Map::new();
                    ops.insert("equals".into(), direct.clone());
                    parse_scalar_condition(schema, &result_field, &ops)?
                }
            };
            parts.push(Having::Aggregate {
                func,
                field: field.name.to_string(),
                condition,
            });
        }
        return Ok(parts);
    }

    if !by.iter().any(|b| b == field.name) {
        return Err(DataError::InvalidHavingField {
            entity: schema.name(),
            field: field.name.to_string(),
        });
    }
    let condition = match value {
        JsonValue::Object(ops) => parse_scalar_condition(schema, field, ops)?,
        direct => {
            let mut ops = Map::new();
            ops.insert("equals".into(), direct.clone());
            parse_scalar_condition(schema, field, &ops)?
        }
    };
    Ok(vec![Having::Key {
        field: field.name.to_string(),
        condition,
    }])
}

fn parse_group_order(
    schema: &EntitySchema,
    by: &[String],
    input: &JsonValue,
) -> Result<Vec<GroupOrder>, DataError> {
    let entries: Vec<&JsonValue> = match input {
        JsonValue::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let mut order = Vec::with_capacity(entries.len());
    for entry in entries {
        let (key, value) = single_entry(schema, entry)?;
        if let Ok(func) = AggregateFn::from_str(key) {
            let (field_name, dir) = single_entry(schema, value)?;
            let field = schema.require_field(field_name)?;
            func.validate(schema, field)?;
            let (dir, _) = parse_direction(schema, dir)?;
            order.push(GroupOrder::Aggregate {
                func,
                field: field.name.to_string(),
                order: dir,
            });
            continue;
        }
        let field = schema.require_field(key)?;
        if !by.iter().any(|b| b == field.name) {
            return Err(DataError::shape(
                schema.name(),
                format!("orderBy `{key}` must be one of the by fields or an aggregate"),
            ));
        }
        let (dir, nulls): (SortOrder, Option<NullsOrder>) = parse_direction(schema, value)?;
        order.push(GroupOrder::Key(OrderBy {
            field: field.name.to_string(),
            order: dir,
            nulls,
        }));
    }
    Ok(order)
}
