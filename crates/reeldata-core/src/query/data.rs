// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write payloads: create data, update data and nested relation writes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::error::DataError;
use crate::record::Record;
use crate::schema::{DefaultValue, Entity, EntitySchema, FieldDef, RelationDef, ScalarType, SchemaRegistry};
use crate::query::filter::Filter;
use crate::value::{json_kind, Value};

/// Validated create data for one row, plus nested relation writes.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInput {
    pub entity: Entity,
    /// Scalar values given explicitly.
    pub values: BTreeMap<String, Value>,
    /// Owning relations to resolve into foreign keys before insert.
    pub connects: Vec<(RelationDef, Filter)>,
    /// Rows to create on inverse relations after the parent is inserted.
    pub nested: Vec<(RelationDef, Vec<CreateInput>)>,
}

/// Relation change on the owning side of an update.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationWrite {
    Connect(Filter),
    Disconnect,
}

/// One scalar update operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    Increment(Value),
    Decrement(Value),
    Multiply(Value),
    Divide(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInput {
    pub entity: Entity,
    pub updates: Vec<(String, FieldUpdate)>,
    pub relations: Vec<(RelationDef, RelationWrite)>,
}

impl CreateInput {
    /// Validates create `data` against `schema`.
    ///
    /// `parent` names the foreign key a nested create receives from its
    /// parent; callers must not set it themselves.
    pub fn parse(
        registry: &SchemaRegistry,
        schema: &EntitySchema,
        data: &JsonValue,
        parent: Option<&str>,
    ) -> Result<Self, DataError> {
        let obj = data_object(schema, data)?;
        let mut input = Self {
            entity: schema.entity,
            values: BTreeMap::new(),
            connects: Vec::new(),
            nested: Vec::new(),
        };
        for (key, value) in obj {
            if let Some(field) = schema.field(key) {
                if parent == Some(field.name) {
                    return Err(DataError::shape(
                        schema.name(),
                        format!("`{key}` is set by the parent record in a nested create"),
                    ));
                }
                input
                    .values
                    .insert(field.name.to_string(), Value::from_input(&schema.name(), field, value)?);
            } else if let Some(relation) = schema.relation(key) {
                if relation.owning {
                    if parent == Some(relation.local_field) {
                        return Err(DataError::shape(
                            schema.name(),
                            format!("`{key}` is set by the parent record in a nested create"),
                        ));
                    }
                    let nested = single_key(schema, relation, value, &["connect"])?;
                    let target = registry.get(relation.target);
                    let filter = Filter::parse_unique(registry, target, nested.1, "connect")?;
                    input.connects.push((relation.clone(), filter));
                } else {
                    let (_, rows) = single_key(schema, relation, value, &["create"])?;
                    let target = registry.get(relation.target);
                    let rows: Vec<&JsonValue> = match rows {
                        JsonValue::Array(items) if relation.is_many() => items.iter().collect(),
                        JsonValue::Object(_) => vec![rows],
                        other => {
                            return Err(DataError::shape(
                                schema.name(),
                                format!(
                                    "nested create on `{}` takes {}, found {}",
                                    relation.name,
                                    if relation.is_many() { "an object or array" } else { "an object" },
                                    json_kind(other)
                                ),
                            ));
                        }
                    };
                    let children = rows
                        .into_iter()
                        .map(|row| Self::parse(registry, target, row, Some(relation.foreign_field)))
                        .collect::<Result<Vec<_>, _>>()?;
                    input.nested.push((relation.clone(), children));
                }
            } else {
                return Err(DataError::shape(
                    schema.name(),
                    format!("unknown field `{key}` in data for {}", schema.entity),
                ));
            }
        }
        for (relation, _) in &input.connects {
            if input.values.contains_key(relation.local_field) {
                return Err(DataError::shape(
                    schema.name(),
                    format!(
                        "`{}` and `{}` both set the same foreign key",
                        relation.local_field, relation.name
                    ),
                ));
            }
        }
        Ok(input)
    }

    /// Builds the full row: explicit values, then defaults. Fails with
    /// `MissingRequiredField` for anything still unset.
    pub fn build_record(&self, schema: &EntitySchema, now: DateTime<Utc>) -> Result<Record, DataError> {
        let mut record = Record::new();
        for field in &schema.fields {
            let value = match self.values.get(field.name) {
                Some(v) => v.clone(),
                None => match field.default {
                    Some(default) => default_value(field, default, now),
                    None if field.nullable => Value::Null,
                    None => {
                        return Err(DataError::MissingRequiredField {
                            entity: schema.name(),
                            field: field.name.to_string(),
                        });
                    }
                },
            };
            record.set(field.name, value);
        }
        Ok(record)
    }
}

fn default_value(field: &FieldDef, default: DefaultValue, now: DateTime<Utc>) -> Value {
    match default {
        DefaultValue::Uuid => Value::String(Uuid::new_v4().to_string()),
        DefaultValue::Now => Value::DateTime(now),
        DefaultValue::Bool(b) => Value::Boolean(b),
        DefaultValue::Int(i) => Value::Int(i),
        DefaultValue::Str(s) => match field.ty {
            ScalarType::Enum { .. } => Value::Enum(s.to_string()),
            _ => Value::String(s.to_string()),
        },
    }
}

impl UpdateInput {
    pub fn parse(
        registry: &SchemaRegistry,
        schema: &EntitySchema,
        data: &JsonValue,
    ) -> Result<Self, DataError> {
        let obj = data_object(schema, data)?;
        let mut input = Self {
            entity: schema.entity,
            updates: Vec::new(),
            relations: Vec::new(),
        };
        for (key, value) in obj {
            if let Some(field) = schema.field(key) {
                if field.id {
                    return Err(DataError::shape(schema.name(), "the id of a record cannot be updated"));
                }
                input
                    .updates
                    .push((field.name.to_string(), parse_field_update(schema, field, value)?));
            } else if let Some(relation) = schema.relation(key) {
                if !relation.owning {
                    return Err(DataError::shape(
                        schema.name(),
                        format!(
                            "`{}` cannot be written from {}; update the related records directly",
                            relation.name, schema.entity
                        ),
                    ));
                }
                let allowed: &[&str] = if relation.nullable {
                    &["connect", "disconnect"]
                } else {
                    &["connect"]
                };
                let (op, arg) = single_key(schema, relation, value, allowed)?;
                let write = if op == "connect" {
                    let target = registry.get(relation.target);
                    RelationWrite::Connect(Filter::parse_unique(registry, target, arg, "connect")?)
                } else if arg == &JsonValue::Bool(true) {
                    RelationWrite::Disconnect
                } else {
                    return Err(DataError::shape(schema.name(), "disconnect takes `true`"));
                };
                input.relations.push((relation.clone(), write));
            } else {
                return Err(DataError::shape(
                    schema.name(),
                    format!("unknown field `{key}` in data for {}", schema.entity),
                ));
            }
        }
        for (relation, _) in &input.relations {
            if input.updates.iter().any(|(f, _)| f == relation.local_field) {
                return Err(DataError::shape(
                    schema.name(),
                    format!(
                        "`{}` and `{}` both set the same foreign key",
                        relation.local_field, relation.name
                    ),
                ));
            }
        }
        Ok(input)
    }

    /// Applies the updates to `current`, refreshing `updatedAt` fields unless
    /// they were set explicitly.
    pub fn apply(
        &self,
        schema: &EntitySchema,
        current: &Record,
        now: DateTime<Utc>,
    ) -> Result<Record, DataError> {
        let mut next = current.clone();
        for (name, update) in &self.updates {
            let field = schema.require_field(name)?;
            let value = match update {
                FieldUpdate::Set(v) => v.clone(),
                FieldUpdate::Increment(by) => arithmetic(schema, field, current.get(name), by, Op::Add)?,
                FieldUpdate::Decrement(by) => arithmetic(schema, field, current.get(name), by, Op::Sub)?,
                FieldUpdate::Multiply(by) => arithmetic(schema, field, current.get(name), by, Op::Mul)?,
                FieldUpdate::Divide(by) => arithmetic(schema, field, current.get(name), by, Op::Div)?,
            };
            next.set(field.name, value);
        }
        for field in schema.fields.iter().filter(|f| f.updated_at) {
            if !self.updates.iter().any(|(n, _)| n == field.name) {
                next.set(field.name, Value::DateTime(now));
            }
        }
        Ok(next)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.relations.is_empty()
    }
}

fn parse_field_update(
    schema: &EntitySchema,
    field: &FieldDef,
    value: &JsonValue,
) -> Result<FieldUpdate, DataError> {
    let entity = schema.name();
    // Json fields take their document as-is; an object is data, not an operator.
    let ops = match value {
        JsonValue::Object(obj) if field.ty != ScalarType::Json => obj,
        _ => return Ok(FieldUpdate::Set(Value::from_input(&entity, field, value)?)),
    };
    let mut iter = ops.iter();
    let (op, operand) = match (iter.next(), iter.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(DataError::shape(
                entity,
                format!("update of `{}` takes exactly one operator", field.name),
            ));
        }
    };
    if op == "set" {
        return Ok(FieldUpdate::Set(Value::from_input(&entity, field, operand)?));
    }
    if !matches!(op.as_str(), "increment" | "decrement" | "multiply" | "divide") {
        return Err(DataError::shape(
            entity,
            format!("unknown update operator `{op}` on `{}`", field.name),
        ));
    }
    if !field.ty.is_numeric() {
        return Err(DataError::mismatch(
            entity,
            field.name,
            format!("a numeric field for `{op}`"),
            field.ty.to_string(),
        ));
    }
    if operand.is_null() {
        return Err(DataError::mismatch(entity, field.name, field.ty.to_string(), "null"));
    }
    let by = Value::coerce(&entity, field.name, field.ty, operand)?;
    Ok(match op.as_str() {
        "increment" => FieldUpdate::Increment(by),
        "decrement" => FieldUpdate::Decrement(by),
        "multiply" => FieldUpdate::Multiply(by),
        _ => FieldUpdate::Divide(by),
    })
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

fn arithmetic(
    schema: &EntitySchema,
    field: &FieldDef,
    current: &Value,
    by: &Value,
    op: Op,
) -> Result<Value, DataError> {
    let overflow = || {
        DataError::mismatch(
            schema.name(),
            field.name,
            format!("a result within {} range", field.ty),
            "overflow or division by zero",
        )
    };
    match (current, by) {
        // Arithmetic on NULL stays NULL.
        (Value::Null, _) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                Op::Add => a.checked_add(*b),
                Op::Sub => a.checked_sub(*b),
                Op::Mul => a.checked_mul(*b),
                Op::Div => a.checked_div(*b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        (Value::Decimal(a), Value::Decimal(b)) => {
            let result: Option<Decimal> = match op {
                Op::Add => a.checked_add(*b),
                Op::Sub => a.checked_sub(*b),
                Op::Mul => a.checked_mul(*b),
                Op::Div => a.checked_div(*b),
            };
            result.map(Value::Decimal).ok_or_else(overflow)
        }
        (a, b) => Err(DataError::mismatch(
            schema.name(),
            field.name,
            a.type_name(),
            b.type_name(),
        )),
    }
}

fn data_object<'a>(
    schema: &EntitySchema,
    data: &'a JsonValue,
) -> Result<&'a Map<String, JsonValue>, DataError> {
    data.as_object().ok_or_else(|| {
        DataError::shape(
            schema.name(),
            format!("data must be an object, found {}", json_kind(data)),
        )
    })
}

/// Expects `{op: arg}` with `op` among `allowed`.
fn single_key<'a>(
    schema: &EntitySchema,
    relation: &RelationDef,
    value: &'a JsonValue,
    allowed: &[&str],
) -> Result<(&'a str, &'a JsonValue), DataError> {
    let bad = || {
        DataError::shape(
            schema.name(),
            format!("relation `{}` takes {{{}: ...}}", relation.name, allowed.join(" | ")),
        )
    };
    let obj = value.as_object().ok_or_else(bad)?;
    let mut iter = obj.iter();
    match (iter.next(), iter.next()) {
        (Some((key, arg)), None) if allowed.contains(&key.as_str()) => Ok((key.as_str(), arg)),
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::now_millis;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
    }

    #[test]
    fn create_fills_defaults() {
        let registry = registry();
        let schema = registry.get(Entity::Video);
        let input = CreateInput::parse(
            &registry,
            schema,
            &json!({"userId": "u1", "prompt": "sunset", "duration": 30, "style": "CINEMATIC"}),
            None,
        )
        .unwrap();
        let now = now_millis();
        let row = input.build_record(schema, now).unwrap();
        assert_eq!(row.get("status"), &Value::Enum("QUEUED".into()));
        assert_eq!(row.get("language"), &Value::String("en".into()));
        assert_eq!(row.get("tokensUsed"), &Value::Int(0));
        assert_eq!(row.get("createdAt"), &Value::DateTime(now));
        assert!(row.get("metadata").is_null());
        assert_eq!(row.id().len(), 36);
    }

    #[test]
    fn create_without_required_field_fails() {
        let registry = registry();
        let schema = registry.get(Entity::Video);
        let input = CreateInput::parse(&registry, schema, &json!({"userId": "u1", "prompt": "p", "duration": 5}), None)
            .unwrap();
        let err = input.build_record(schema, now_millis()).unwrap_err();
        assert!(matches!(err, DataError::MissingRequiredField { field, .. } if field == "style"));
    }

    #[test]
    fn create_parses_connect_and_nested_create() {
        let registry = registry();
        let user = registry.get(Entity::User);
        let input = CreateInput::parse(
            &registry,
            user,
            &json!({
                "email": "a@x.com",
                "subscription": {"create": {"features": {}, "limits": {}}},
                "videos": {"create": [{"prompt": "a", "duration": 5, "style": "SOCIAL"}]}
            }),
            None,
        )
        .unwrap();
        assert_eq!(input.nested.len(), 2);

        let video = registry.get(Entity::Video);
        let connected = CreateInput::parse(
            &registry,
            video,
            &json!({"user": {"connect": {"email": "a@x.com"}}, "prompt": "p", "duration": 5, "style": "SOCIAL"}),
            None,
        )
        .unwrap();
        assert_eq!(connected.connects.len(), 1);
    }

    #[test]
    fn nested_create_cannot_set_parent_key() {
        let registry = registry();
        let err = CreateInput::parse(
            &registry,
            registry.get(Entity::User),
            &json!({"email": "a@x.com", "videos": {"create": {"userId": "other", "prompt": "a", "duration": 5, "style": "SOCIAL"}}}),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidFilterShape { .. }));
    }

    #[test]
    fn arithmetic_updates() {
        let registry = registry();
        let schema = registry.get(Entity::Video);
        let input = UpdateInput::parse(
            &registry,
            schema,
            &json!({"tokensUsed": {"increment": 5}, "duration": {"multiply": 2}}),
        )
        .unwrap();
        let mut current = Record::new();
        current.set("tokensUsed", Value::Int(10));
        current.set("duration", Value::Int(30));
        let now = now_millis();
        let next = input.apply(schema, &current, now).unwrap();
        assert_eq!(next.get("tokensUsed"), &Value::Int(15));
        assert_eq!(next.get("duration"), &Value::Int(60));
        assert_eq!(next.get("updatedAt"), &Value::DateTime(now));
    }

    #[test]
    fn arithmetic_on_string_is_type_mismatch() {
        let registry = registry();
        let err = UpdateInput::parse(&registry, registry.get(Entity::Video), &json!({"prompt": {"increment": 1}}))
            .unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch { .. }));
    }

    #[test]
    fn divide_by_zero_is_rejected() {
        let registry = registry();
        let schema = registry.get(Entity::Video);
        let input = UpdateInput::parse(&registry, schema, &json!({"duration": {"divide": 0}})).unwrap();
        let mut current = Record::new();
        current.set("duration", Value::Int(30));
        assert!(input.apply(schema, &current, now_millis()).is_err());
    }

    #[test]
    fn json_update_takes_object_as_document() {
        let registry = registry();
        let schema = registry.get(Entity::Video);
        let input = UpdateInput::parse(&registry, schema, &json!({"metadata": {"set": 1}})).unwrap();
        assert_eq!(
            input.updates[0].1,
            FieldUpdate::Set(Value::Json(json!({"set": 1})))
        );
    }

    #[test]
    fn disconnect_only_on_optional_relation() {
        let registry = registry();
        assert!(UpdateInput::parse(
            &registry,
            registry.get(Entity::AnalyticsEvent),
            &json!({"user": {"disconnect": true}})
        )
        .is_ok());
        assert!(UpdateInput::parse(
            &registry,
            registry.get(Entity::Video),
            &json!({"user": {"disconnect": true}})
        )
        .is_err());
    }

    #[test]
    fn id_cannot_be_updated() {
        let registry = registry();
        assert!(UpdateInput::parse(&registry, registry.get(Entity::User), &json!({"id": "x"})).is_err());
    }
}
