// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between typed [`Value`]s and SQLite column values.
//!
//! Date-times are RFC 3339 text with millisecond precision, decimals are
//! exact decimal text, booleans are 0/1 and JSON columns hold the serialized
//! document. SQL NULL is [`Value::Null`]; the text `null` in a JSON column is
//! the JSON `null` literal.

use reeldata_core::schema::{EntitySchema, FieldDef, ScalarType};
use reeldata_core::value::{format_datetime, parse_datetime, parse_decimal};
use reeldata_core::{DataError, Record, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Row;
use serde_json::Value as JsonValue;

/// Encodes a value for binding as a statement parameter.
pub fn to_sql(value: &Value) -> Result<SqlValue, DataError> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::String(s) | Value::Enum(s) => SqlValue::Text(s.clone()),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
        Value::DateTime(dt) => SqlValue::Text(format_datetime(dt)),
        Value::Decimal(d) => SqlValue::Text(d.to_string()),
        Value::Json(doc) => SqlValue::Text(serde_json::to_string(doc).map_err(DataError::storage)?),
    })
}

/// Decodes the column value of `field`.
pub fn from_sql(schema: &EntitySchema, field: &FieldDef, raw: ValueRef<'_>) -> Result<Value, DataError> {
    let corrupt = |found: &str| {
        DataError::storage(format!(
            "column {}.{} holds {found}, expected {}",
            schema.table, field.column, field.ty
        ))
    };
    let text = |raw: ValueRef<'_>| -> Result<String, DataError> {
        match raw {
            ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec()).map_err(DataError::storage),
            _ => Err(corrupt(kind(raw))),
        }
    };

    if let ValueRef::Null = raw {
        return Ok(Value::Null);
    }
    Ok(match field.ty {
        ScalarType::String => Value::String(text(raw)?),
        ScalarType::Enum { .. } => Value::Enum(text(raw)?),
        ScalarType::Int => match raw {
            ValueRef::Integer(i) => Value::Int(i),
            _ => return Err(corrupt(kind(raw))),
        },
        ScalarType::Boolean => match raw {
            ValueRef::Integer(i) => Value::Boolean(i != 0),
            _ => return Err(corrupt(kind(raw))),
        },
        ScalarType::DateTime => {
            let s = text(raw)?;
            Value::DateTime(parse_datetime(&s).ok_or_else(|| corrupt(&format!("`{s}`")))?)
        }
        ScalarType::Decimal => match raw {
            ValueRef::Integer(i) => Value::Decimal(i.into()),
            _ => {
                let s = text(raw)?;
                Value::Decimal(parse_decimal(&s).ok_or_else(|| corrupt(&format!("`{s}`")))?)
            }
        },
        ScalarType::Json => {
            let s = text(raw)?;
            Value::Json(serde_json::from_str::<JsonValue>(&s).map_err(DataError::storage)?)
        }
    })
}

/// Reads a full row selected with [`column_list`].
pub fn read_record(schema: &EntitySchema, row: &Row<'_>) -> Result<Record, DataError> {
    schema
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let raw = row.get_ref(i).map_err(DataError::storage)?;
            Ok((field.name.to_string(), from_sql(schema, field, raw)?))
        })
        .collect()
}

/// `"id", "email", ...` in declaration order.
pub fn column_list(schema: &EntitySchema) -> String {
    schema
        .fields
        .iter()
        .map(|f| quote(f.column))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

/// JSON rendering of a raw result cell, used by `query_raw`.
pub fn raw_to_json(raw: ValueRef<'_>) -> JsonValue {
    match raw {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => JsonValue::from(f),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
    }
}

/// Binds a JSON scalar as a raw statement parameter. Arrays and objects bind
/// as their serialized text.
pub fn json_to_sql(param: &JsonValue) -> SqlValue {
    match param {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn kind(raw: ValueRef<'_>) -> &'static str {
    match raw {
        ValueRef::Null => "NULL",
        ValueRef::Integer(_) => "INTEGER",
        ValueRef::Real(_) => "REAL",
        ValueRef::Text(_) => "TEXT",
        ValueRef::Blob(_) => "BLOB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reeldata_core::{Entity, SchemaRegistry};
    use serde_json::json;

    fn field<'a>(registry: &'a SchemaRegistry, entity: Entity, name: &str) -> (&'a EntitySchema, &'a FieldDef) {
        let schema = registry.get(entity);
        (schema, schema.field(name).unwrap())
    }

    #[test]
    fn json_null_and_db_null_stay_distinct() {
        let registry = SchemaRegistry::new();
        let (schema, metadata) = field(&registry, Entity::Video, "metadata");

        assert_eq!(to_sql(&Value::Null).unwrap(), SqlValue::Null);
        assert_eq!(
            to_sql(&Value::Json(JsonValue::Null)).unwrap(),
            SqlValue::Text("null".into())
        );
        assert_eq!(
            to_sql(&Value::Json(json!("null"))).unwrap(),
            SqlValue::Text("\"null\"".into())
        );

        assert_eq!(from_sql(schema, metadata, ValueRef::Null).unwrap(), Value::Null);
        assert_eq!(
            from_sql(schema, metadata, ValueRef::Text(b"null")).unwrap(),
            Value::Json(JsonValue::Null)
        );
        assert_eq!(
            from_sql(schema, metadata, ValueRef::Text(b"\"null\"")).unwrap(),
            Value::Json(json!("null"))
        );
    }

    #[test]
    fn decimals_keep_exact_text() {
        let registry = SchemaRegistry::new();
        let (schema, amount) = field(&registry, Entity::SubscriptionHistory, "amount");
        let value = from_sql(schema, amount, ValueRef::Text(b"10.10")).unwrap();
        assert_eq!(to_sql(&value).unwrap(), SqlValue::Text("10.10".into()));
    }

    #[test]
    fn booleans_are_integers() {
        let registry = SchemaRegistry::new();
        let (schema, is_deleted) = field(&registry, Entity::User, "isDeleted");
        assert_eq!(to_sql(&Value::Boolean(true)).unwrap(), SqlValue::Integer(1));
        assert_eq!(
            from_sql(schema, is_deleted, ValueRef::Integer(0)).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn wrong_storage_class_is_a_storage_error() {
        let registry = SchemaRegistry::new();
        let (schema, duration) = field(&registry, Entity::Video, "duration");
        let err = from_sql(schema, duration, ValueRef::Text(b"long")).unwrap_err();
        assert!(matches!(err, DataError::Storage { .. }));
    }
}
