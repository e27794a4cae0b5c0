// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `orderBy` clauses.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::error::DataError;
use crate::record::Record;
use crate::schema::{EntitySchema, ScalarType};
use crate::value::{json_kind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Explicit placement of nulls; without it nulls sort as the smallest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub order: SortOrder,
    pub nulls: Option<NullsOrder>,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
            nulls: None,
        }
    }

    /// Compares two values under this clause.
    pub fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        match (a.is_null(), b.is_null(), self.nulls) {
            (true, true, _) => Ordering::Equal,
            (true, false, Some(NullsOrder::First)) | (false, true, Some(NullsOrder::Last)) => {
                Ordering::Less
            }
            (true, false, Some(NullsOrder::Last)) | (false, true, Some(NullsOrder::First)) => {
                Ordering::Greater
            }
            _ => {
                let ord = a.sort_cmp(b);
                match self.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
        }
    }
}

/// Parses `orderBy`: one `{field: dir}` object or an array of them.
pub fn parse_order_by(schema: &EntitySchema, input: &JsonValue) -> Result<Vec<OrderBy>, DataError> {
    let entries: Vec<&JsonValue> = match input {
        JsonValue::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    entries
        .into_iter()
        .map(|entry| {
            let (key, value) = single_entry(schema, entry)?;
            let field = schema.require_field(key)?;
            if field.ty == ScalarType::Json {
                return Err(DataError::mismatch(
                    schema.name(),
                    field.name,
                    "a sortable field",
                    "Json",
                ));
            }
            let (order, nulls) = parse_direction(schema, value)?;
            Ok(OrderBy {
                field: field.name.to_string(),
                order,
                nulls,
            })
        })
        .collect()
}

/// Splits a single-key object into its key and value.
pub(crate) fn single_entry<'a>(
    schema: &EntitySchema,
    entry: &'a JsonValue,
) -> Result<(&'a str, &'a JsonValue), DataError> {
    let obj = entry.as_object().ok_or_else(|| {
        DataError::shape(
            schema.name(),
            format!("orderBy entries must be objects, found {}", json_kind(entry)),
        )
    })?;
    let mut iter = obj.iter();
    match (iter.next(), iter.next()) {
        (Some((key, value)), None) => Ok((key.as_str(), value)),
        _ => Err(DataError::shape(
            schema.name(),
            "each orderBy object names exactly one field; use an array to sort by several",
        )),
    }
}

/// `"asc"`, `"desc"` or `{"sort": dir, "nulls": "first" | "last"}`.
pub(crate) fn parse_direction(
    schema: &EntitySchema,
    value: &JsonValue,
) -> Result<(SortOrder, Option<NullsOrder>), DataError> {
    let bad = || {
        DataError::shape(
            schema.name(),
            format!("sort direction must be \"asc\" or \"desc\", found {value}"),
        )
    };
    let sort = |v: &JsonValue| match v.as_str() {
        Some("asc") => Ok(SortOrder::Asc),
        Some("desc") => Ok(SortOrder::Desc),
        _ => Err(bad()),
    };
    match value {
        JsonValue::String(_) => Ok((sort(value)?, None)),
        JsonValue::Object(obj) => {
            let order = sort(obj.get("sort").ok_or_else(bad)?)?;
            let nulls = match obj.get("nulls").map(|n| n.as_str()) {
                None => None,
                Some(Some("first")) => Some(NullsOrder::First),
                Some(Some("last")) => Some(NullsOrder::Last),
                Some(_) => {
                    return Err(DataError::shape(
                        schema.name(),
                        "nulls must be \"first\" or \"last\"",
                    ));
                }
            };
            if obj.keys().any(|k| k != "sort" && k != "nulls") {
                return Err(bad());
            }
            Ok((order, nulls))
        }
        _ => Err(bad()),
    }
}

/// Lexicographic comparison of two records under `order`.
pub fn compare_records(a: &Record, b: &Record, order: &[OrderBy]) -> Ordering {
    order
        .iter()
        .map(|o| o.compare_values(a.get(&o.field), b.get(&o.field)))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
