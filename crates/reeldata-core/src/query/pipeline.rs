// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter, sort, distinct and pagination over a candidate row set.
//!
//! Every read goes through [`FindQuery::run`]: top-level finds, nested
//! to-many includes, aggregates and counts. Rows arrive in storage order
//! (insertion order), which is the order used when no `orderBy` is given.

use std::collections::HashSet;

use serde_json::Value as JsonValue;

use crate::error::DataError;
use crate::query::filter::Filter;
use crate::query::order::{compare_records, parse_order_by, OrderBy};
use crate::record::Record;
use crate::schema::{EntitySchema, ScalarType, SchemaRegistry};
use crate::traits::RelationResolver;
use crate::value::Value;

/// A compiled `findMany`-style query without projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Option<Filter>,
    pub order: Vec<OrderBy>,
    /// Unique filter locating the cursor row.
    pub cursor: Option<Filter>,
    /// Negative values take rows before the cursor (or from the end).
    pub take: Option<i64>,
    pub skip: Option<u64>,
    pub distinct: Vec<String>,
}

/// Raw pagination inputs shared by every query-style argument struct.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParts<'a> {
    pub filter: Option<&'a JsonValue>,
    pub order_by: Option<&'a JsonValue>,
    pub cursor: Option<&'a JsonValue>,
    pub take: Option<i64>,
    pub skip: Option<u64>,
    pub distinct: Option<&'a [String]>,
}

impl FindQuery {
    /// Compiles query parts against `schema`.
    pub fn compile(
        registry: &SchemaRegistry,
        schema: &EntitySchema,
        parts: QueryParts<'_>,
    ) -> Result<Self, DataError> {
        let filter = parts
            .filter
            .map(|f| Filter::parse(registry, schema, f))
            .transpose()?;
        let order = parts
            .order_by
            .map(|o| parse_order_by(schema, o))
            .transpose()?
            .unwrap_or_default();
        let cursor = parts
            .cursor
            .map(|c| Filter::parse_unique(registry, schema, c, "cursor"))
            .transpose()?;
        let mut distinct = Vec::new();
        for name in parts.distinct.unwrap_or_default() {
            let field = schema.require_field(name)?;
            if field.ty == ScalarType::Json {
                return Err(DataError::mismatch(
                    schema.name(),
                    field.name,
                    "a comparable field for distinct",
                    "Json",
                ));
            }
            distinct.push(field.name.to_string());
        }
        Ok(Self {
            filter,
            order,
            cursor,
            take: parts.take,
            skip: parts.skip,
            distinct,
        })
    }

    pub fn with_filter(filter: Option<Filter>) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Runs the query over `rows`.
    pub fn run(
        &self,
        rows: Vec<Record>,
        resolver: &dyn RelationResolver,
    ) -> Result<Vec<Record>, DataError> {
        let mut rows = self.apply_filter(rows, resolver)?;
        if !self.order.is_empty() {
            rows.sort_by(|a, b| compare_records(a, b, &self.order));
        }
        if !self.distinct.is_empty() {
            rows = distinct_by(rows, &self.distinct);
        }
        self.window(rows, resolver)
    }

    /// Keeps the rows matching the filter.
    pub fn apply_filter(
        &self,
        rows: Vec<Record>,
        resolver: &dyn RelationResolver,
    ) -> Result<Vec<Record>, DataError> {
        let Some(filter) = &self.filter else {
            return Ok(rows);
        };
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if filter.matches(&row, resolver)? {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    fn window(
        &self,
        rows: Vec<Record>,
        resolver: &dyn RelationResolver,
    ) -> Result<Vec<Record>, DataError> {
        let anchor = match &self.cursor {
            None => None,
            Some(cursor) => {
                let mut found = None;
                for (i, row) in rows.iter().enumerate() {
                    if cursor.matches(row, resolver)? {
                        found = Some(i);
                        break;
                    }
                }
                match found {
                    Some(i) => Some(i),
                    // The cursor row is gone or filtered out: nothing to page from.
                    None => return Ok(Vec::new()),
                }
            }
        };
        Ok(paginate(rows, anchor, self.take, self.skip))
    }
}

/// Slices `rows` around an optional cursor index.
pub fn paginate<T>(rows: Vec<T>, anchor: Option<usize>, take: Option<i64>, skip: Option<u64>) -> Vec<T> {
    let len = rows.len();
    let skip = usize::try_from(skip.unwrap_or(0)).unwrap_or(usize::MAX);
    let (start, end) = match take {
        Some(t) if t < 0 => {
            let n = usize::try_from(t.unsigned_abs()).unwrap_or(usize::MAX);
            let end = anchor.map_or(len, |i| i + 1).saturating_sub(skip);
            (end.saturating_sub(n), end)
        }
        _ => {
            let start = anchor.unwrap_or(0).saturating_add(skip).min(len);
            let end = match take {
                Some(t) => start
                    .saturating_add(usize::try_from(t).unwrap_or(usize::MAX))
                    .min(len),
                None => len,
            };
            (start, end)
        }
    };
    rows.into_iter().skip(start).take(end - start).collect()
}

/// Keeps the first row of each distinct combination of `fields`.
pub fn distinct_by(rows: Vec<Record>, fields: &[String]) -> Vec<Record> {
    let mut seen: HashSet<String> = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key = fields
                .iter()
                .map(|f| fingerprint(row.get(f)))
                .collect::<Vec<_>>()
                .join("\u{1f}");
            seen.insert(key)
        })
        .collect()
}

/// Hashable rendering of a value; decimals are normalized so `1.0` and `1.00`
/// collide.
pub(crate) fn fingerprint(value: &Value) -> String {
    match value {
        Value::Decimal(d) => d.normalize().to_string(),
        other => other.to_json().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::tests::{record, MemoryResolver};
    use crate::schema::Entity;
    use serde_json::json;

    fn videos() -> Vec<Record> {
        (1..=6)
            .map(|i| {
                record(&[
                    ("id", Value::String(format!("v{i}"))),
                    ("duration", Value::Int(i * 10)),
                    ("style", Value::Enum((if i % 2 == 0 { "SOCIAL" } else { "CINEMATIC" }).to_string())),
                ])
            })
            .collect()
    }

    fn run(parts: QueryParts<'_>) -> Vec<String> {
        let registry = SchemaRegistry::new();
        let query = FindQuery::compile(&registry, registry.get(Entity::Video), parts).unwrap();
        query
            .run(videos(), &MemoryResolver::default())
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect()
    }

    #[test]
    fn filter_sort_and_window() {
        let filter = json!({"duration": {"gte": 20}});
        let order = json!({"duration": "desc"});
        let ids = run(QueryParts {
            filter: Some(&filter),
            order_by: Some(&order),
            take: Some(2),
            skip: Some(1),
            ..QueryParts::default()
        });
        assert_eq!(ids, ["v5", "v4"]);
    }

    #[test]
    fn cursor_forward_includes_cursor_row() {
        let cursor = json!({"id": "v3"});
        let ids = run(QueryParts {
            cursor: Some(&cursor),
            take: Some(2),
            ..QueryParts::default()
        });
        assert_eq!(ids, ["v3", "v4"]);

        let skipped = run(QueryParts {
            cursor: Some(&cursor),
            take: Some(2),
            skip: Some(1),
            ..QueryParts::default()
        });
        assert_eq!(skipped, ["v4", "v5"]);
    }

    #[test]
    fn negative_take_pages_backwards() {
        let cursor = json!({"id": "v4"});
        let ids = run(QueryParts {
            cursor: Some(&cursor),
            take: Some(-2),
            ..QueryParts::default()
        });
        assert_eq!(ids, ["v3", "v4"]);

        let tail = run(QueryParts {
            take: Some(-2),
            ..QueryParts::default()
        });
        assert_eq!(tail, ["v5", "v6"]);
    }

    #[test]
    fn missing_cursor_yields_nothing() {
        let cursor = json!({"id": "v99"});
        let ids = run(QueryParts {
            cursor: Some(&cursor),
            ..QueryParts::default()
        });
        assert!(ids.is_empty());
    }

    #[test]
    fn distinct_keeps_first_per_key() {
        let distinct = vec!["style".to_string()];
        let ids = run(QueryParts {
            distinct: Some(&distinct),
            ..QueryParts::default()
        });
        assert_eq!(ids, ["v1", "v2"]);
    }

    #[test]
    fn paginate_bounds_are_clamped() {
        assert_eq!(paginate(vec![1, 2, 3], None, Some(10), Some(2)), vec![3]);
        assert!(paginate(vec![1, 2, 3], None, None, Some(5)).is_empty());
        assert_eq!(paginate(vec![1, 2, 3], Some(0), Some(-5), None), vec![1]);
    }
}
