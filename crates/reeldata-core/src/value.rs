// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scalar values and their conversion from caller-supplied JSON.
//!
//! Callers describe data and filters as JSON; every operand is coerced into a
//! [`Value`] of the field's declared type before it is compared or stored.
//! Decimals go through `rust_decimal` from their textual form, so `"10.10"`
//! and `10.10` are the same value and no binary floating point is involved.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use strum::{Display, EnumString};

use crate::error::DataError;
use crate::schema::{FieldDef, ScalarType};

/// Key of the single-entry object that spells a null sentinel.
pub const NULL_SENTINEL_KEY: &str = "$null";

/// The three ways a JSON field can be "null".
///
/// `DbNull` is a missing column value (SQL NULL), `JsonNull` is a stored JSON
/// `null` literal. `AnyNull` only appears in filters and matches either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum NullSentinel {
    DbNull,
    JsonNull,
    AnyNull,
}

impl NullSentinel {
    pub fn to_json(self) -> JsonValue {
        json!({ NULL_SENTINEL_KEY: self.to_string() })
    }

    /// Recognizes `{"$null": "DbNull" | "JsonNull" | "AnyNull"}`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        obj.get(NULL_SENTINEL_KEY)?.as_str()?.parse().ok()
    }
}

/// Sentinel for "column holds no value".
pub fn db_null() -> JsonValue {
    NullSentinel::DbNull.to_json()
}

/// Sentinel for "column holds the JSON literal `null`".
pub fn json_null() -> JsonValue {
    NullSentinel::JsonNull.to_json()
}

/// Filter sentinel matching either kind of null.
pub fn any_null() -> JsonValue {
    NullSentinel::AnyNull.to_json()
}

/// A typed scalar held by a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    String(String),
    Int(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Decimal(Decimal),
    Enum(String),
    /// A JSON document; `Json(JsonValue::Null)` is the JSON `null` literal.
    Json(JsonValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "String",
            Self::Int(_) => "Int",
            Self::Boolean(_) => "Boolean",
            Self::DateTime(_) => "DateTime",
            Self::Decimal(_) => "Decimal",
            Self::Enum(_) => "enum",
            Self::Json(_) => "Json",
        }
    }

    /// Coerces a caller-supplied value for `field` as it would be written.
    ///
    /// JSON fields require an explicit sentinel instead of a bare `null`.
    pub fn from_input(entity: &str, field: &FieldDef, input: &JsonValue) -> Result<Self, DataError> {
        if field.ty == ScalarType::Json {
            return match NullSentinel::from_json(input) {
                Some(NullSentinel::DbNull) if field.nullable => Ok(Self::Null),
                Some(NullSentinel::JsonNull) => Ok(Self::Json(JsonValue::Null)),
                Some(other) => Err(DataError::mismatch(
                    entity,
                    field.name,
                    if field.nullable { "Json, DbNull or JsonNull" } else { "Json or JsonNull" },
                    other.to_string(),
                )),
                None if input.is_null() => Err(DataError::mismatch(
                    entity,
                    field.name,
                    "Json value or a DbNull/JsonNull sentinel",
                    "bare null",
                )),
                None => Ok(Self::Json(input.clone())),
            };
        }
        if input.is_null() {
            return if field.nullable {
                Ok(Self::Null)
            } else {
                Err(DataError::mismatch(entity, field.name, field.ty.to_string(), "null"))
            };
        }
        Self::coerce(entity, field.name, field.ty, input)
    }

    /// Coerces a non-null JSON operand to `ty`.
    pub fn coerce(
        entity: &str,
        field: &str,
        ty: ScalarType,
        input: &JsonValue,
    ) -> Result<Self, DataError> {
        let mismatch = || DataError::mismatch(entity, field, ty.to_string(), json_kind(input));
        match ty {
            ScalarType::String => input
                .as_str()
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(mismatch),
            ScalarType::Int => input.as_i64().map(Self::Int).ok_or_else(mismatch),
            ScalarType::Boolean => input.as_bool().map(Self::Boolean).ok_or_else(mismatch),
            ScalarType::DateTime => input
                .as_str()
                .and_then(parse_datetime)
                .map(Self::DateTime)
                .ok_or_else(mismatch),
            ScalarType::Decimal => {
                let parsed = match input {
                    JsonValue::String(s) => parse_decimal(s),
                    JsonValue::Number(n) => parse_decimal(&n.to_string()),
                    _ => None,
                };
                parsed.map(Self::Decimal).ok_or_else(mismatch)
            }
            ScalarType::Enum { name, variants } => match input.as_str() {
                Some(s) if variants.contains(&s) => Ok(Self::Enum(s.to_string())),
                Some(s) => Err(DataError::mismatch(
                    entity,
                    field,
                    format!("one of {name}: {}", variants.join(", ")),
                    format!("\"{s}\""),
                )),
                None => Err(mismatch()),
            },
            ScalarType::Json => Ok(Self::Json(input.clone())),
        }
    }

    /// Ordering between two comparable values; `None` when the types differ
    /// or either side is null.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) | (Self::Enum(a), Self::Enum(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (Self::Decimal(a), Self::Int(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality used for grouping and distinct: nulls are equal to each other,
    /// decimals compare by value.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Json(a), Self::Json(b)) => a == b,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// Total order for sorting: nulls first, incomparable values equal.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    /// JSON rendering returned to callers. Decimals render as strings so no
    /// precision is lost.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::String(s) | Self::Enum(s) => JsonValue::String(s.clone()),
            Self::Int(i) => JsonValue::from(*i),
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::DateTime(dt) => JsonValue::String(format_datetime(dt)),
            Self::Decimal(d) => JsonValue::String(d.to_string()),
            Self::Json(v) => v.clone(),
        }
    }
}

/// Current time truncated to the stored millisecond precision.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 timestamp, truncating to millisecond precision.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(3))
}

/// Parses plain or scientific decimal notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// JSON type name for error messages.
pub fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn amount_field() -> FieldDef {
        FieldDef::new("amount", "amount", ScalarType::Decimal).optional()
    }

    #[test]
    fn decimal_string_and_number_compare_equal() {
        let field = amount_field();
        let from_str = Value::from_input("SubscriptionHistory", &field, &json!("10.10")).unwrap();
        let from_num = Value::from_input("SubscriptionHistory", &field, &json!(10.10)).unwrap();
        assert_eq!(from_str.compare(&from_num), Some(Ordering::Equal));
        assert!(from_str.same_as(&from_num));
    }

    #[test]
    fn decimal_sum_has_no_float_artifacts() {
        let a = parse_decimal("0.1").unwrap();
        let b = parse_decimal("0.2").unwrap();
        assert_eq!(a + b, parse_decimal("0.3").unwrap());
        assert_eq!((a + b).to_string(), "0.3");
    }

    #[test]
    fn json_field_requires_sentinel_for_null() {
        let field = FieldDef::new("metadata", "metadata", ScalarType::Json).optional();
        let err = Value::from_input("Video", &field, &JsonValue::Null).unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch { .. }));

        assert_eq!(Value::from_input("Video", &field, &db_null()).unwrap(), Value::Null);
        assert_eq!(
            Value::from_input("Video", &field, &json_null()).unwrap(),
            Value::Json(JsonValue::Null)
        );
        assert_eq!(
            Value::from_input("Video", &field, &json!("null")).unwrap(),
            Value::Json(json!("null"))
        );
    }

    #[test]
    fn non_nullable_json_rejects_db_null() {
        let field = FieldDef::new("features", "features", ScalarType::Json);
        assert!(Value::from_input("Subscription", &field, &db_null()).is_err());
    }

    #[test]
    fn enum_values_are_checked() {
        let ty = ScalarType::Enum {
            name: "VideoStatus",
            variants: &["QUEUED", "FAILED"],
        };
        assert_eq!(
            Value::coerce("Video", "status", ty, &json!("QUEUED")).unwrap(),
            Value::Enum("QUEUED".into())
        );
        let err = Value::coerce("Video", "status", ty, &json!("DONE")).unwrap_err();
        assert!(err.to_string().contains("VideoStatus"));
    }

    #[test]
    fn datetime_roundtrips_at_millisecond_precision() {
        let input = json!("2026-03-01T10:20:30.123456Z");
        let v = Value::coerce("User", "createdAt", ScalarType::DateTime, &input).unwrap();
        assert_eq!(v.to_json(), json!("2026-03-01T10:20:30.123Z"));
    }

    #[test]
    fn non_null_field_rejects_null() {
        let field = FieldDef::new("email", "email", ScalarType::String);
        assert!(Value::from_input("User", &field, &JsonValue::Null).is_err());
    }

    #[test]
    fn nulls_sort_first() {
        let mut values = vec![Value::Int(3), Value::Null, Value::Int(1)];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(values, vec![Value::Null, Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn sentinel_is_recognised_only_in_exact_form() {
        assert_eq!(NullSentinel::from_json(&any_null()), Some(NullSentinel::AnyNull));
        assert_eq!(NullSentinel::from_json(&json!({"$null": "DbNull", "x": 1})), None);
        assert_eq!(NullSentinel::from_json(&json!("DbNull")), None);
    }

    proptest! {
        #[test]
        fn cents_parse_identically_from_text_and_number(cents in 0i64..10_000_000_000) {
            let text = Decimal::new(cents, 2).to_string();
            let as_float = cents as f64 / 100.0;
            let number = json!(as_float);
            let field = amount_field();
            let a = Value::from_input("SubscriptionHistory", &field, &json!(text)).unwrap();
            let b = Value::from_input("SubscriptionHistory", &field, &number).unwrap();
            prop_assert_eq!(a.compare(&b), Some(Ordering::Equal));
        }
    }
}
