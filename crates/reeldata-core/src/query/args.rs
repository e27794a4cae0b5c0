// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argument objects accepted by each operation.
//!
//! Field names follow the wire shape callers already use (`where`, `orderBy`,
//! `skipDuplicates`, `_count`, ...). Filters, data and projections stay as
//! JSON here and are validated against the schema when the operation is
//! compiled.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DataError;
use crate::query::pipeline::QueryParts;

/// Parses an argument object from JSON, reporting problems as
/// `InvalidFilterShape`.
pub trait Args: DeserializeOwned {
    fn from_json(value: JsonValue) -> Result<Self, DataError> {
        serde_json::from_value(value).map_err(|e| DataError::shape("arguments", e.to_string()))
    }
}

/// `select` / `include` / `omit` for one level of a result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Projection<'a> {
    pub select: Option<&'a JsonValue>,
    pub include: Option<&'a JsonValue>,
    pub omit: Option<&'a JsonValue>,
}

macro_rules! projection {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $ty {
                pub fn projection(&self) -> Projection<'_> {
                    Projection {
                        select: self.select.as_ref(),
                        include: self.include.as_ref(),
                        omit: self.omit.as_ref(),
                    }
                }

                pub fn select(mut self, select: JsonValue) -> Self {
                    self.select = Some(select);
                    self
                }

                pub fn include(mut self, include: JsonValue) -> Self {
                    self.include = Some(include);
                    self
                }

                pub fn omit(mut self, omit: JsonValue) -> Self {
                    self.omit = Some(omit);
                    self
                }
            }

            impl Args for $ty {}
        )+
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FindUniqueArgs {
    #[serde(rename = "where")]
    pub filter: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<JsonValue>,
}

impl FindUniqueArgs {
    pub fn new(filter: JsonValue) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

/// Arguments of `findMany` and `findFirst`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FindManyArgs {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<JsonValue>,
}

impl FindManyArgs {
    pub fn filter(mut self, filter: JsonValue) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order_by: JsonValue) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn cursor(mut self, cursor: JsonValue) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn distinct<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.distinct = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn query_parts(&self) -> QueryParts<'_> {
        QueryParts {
            filter: self.filter.as_ref(),
            order_by: self.order_by.as_ref(),
            cursor: self.cursor.as_ref(),
            take: self.take,
            skip: self.skip,
            distinct: self.distinct.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateArgs {
    pub data: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<JsonValue>,
}

impl CreateArgs {
    pub fn new(data: JsonValue) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateManyArgs {
    /// One data object or an array of them.
    pub data: JsonValue,
    #[serde(default)]
    pub skip_duplicates: bool,
}

impl CreateManyArgs {
    pub fn new(data: JsonValue) -> Self {
        Self {
            data,
            skip_duplicates: false,
        }
    }

    pub fn skip_duplicates(mut self) -> Self {
        self.skip_duplicates = true;
        self
    }
}

impl Args for CreateManyArgs {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateArgs {
    #[serde(rename = "where")]
    pub filter: JsonValue,
    pub data: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<JsonValue>,
}

impl UpdateArgs {
    pub fn new(filter: JsonValue, data: JsonValue) -> Self {
        Self {
            filter,
            data,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateManyArgs {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    pub data: JsonValue,
    /// Caps the number of rows updated, in storage order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl UpdateManyArgs {
    pub fn new(filter: Option<JsonValue>, data: JsonValue) -> Self {
        Self {
            filter,
            data,
            limit: None,
        }
    }
}

impl Args for UpdateManyArgs {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpsertArgs {
    #[serde(rename = "where")]
    pub filter: JsonValue,
    pub create: JsonValue,
    pub update: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<JsonValue>,
}

impl UpsertArgs {
    pub fn new(filter: JsonValue, create: JsonValue, update: JsonValue) -> Self {
        Self {
            filter,
            create,
            update,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteArgs {
    #[serde(rename = "where")]
    pub filter: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<JsonValue>,
}

impl DeleteArgs {
    pub fn new(filter: JsonValue) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteManyArgs {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl DeleteManyArgs {
    pub fn new(filter: Option<JsonValue>) -> Self {
        Self {
            filter,
            limit: None,
        }
    }
}

impl Args for DeleteManyArgs {}

/// Aggregate selections shared by `aggregate` and `groupBy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateFields {
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<JsonValue>,
    #[serde(rename = "_avg", skip_serializing_if = "Option::is_none")]
    pub avg: Option<JsonValue>,
    #[serde(rename = "_sum", skip_serializing_if = "Option::is_none")]
    pub sum: Option<JsonValue>,
    #[serde(rename = "_min", skip_serializing_if = "Option::is_none")]
    pub min: Option<JsonValue>,
    #[serde(rename = "_max", skip_serializing_if = "Option::is_none")]
    pub max: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateArgs {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(flatten)]
    pub aggregates: AggregateFields,
}

impl AggregateArgs {
    pub fn query_parts(&self) -> QueryParts<'_> {
        QueryParts {
            filter: self.filter.as_ref(),
            order_by: self.order_by.as_ref(),
            cursor: self.cursor.as_ref(),
            take: self.take,
            skip: self.skip,
            distinct: None,
        }
    }
}

impl Args for AggregateArgs {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupByArgs {
    /// A field name or an array of field names.
    pub by: JsonValue,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub having: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(flatten)]
    pub aggregates: AggregateFields,
}

impl Args for GroupByArgs {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CountArgs {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// `{"_all": true, "<field>": true}` for per-field non-null counts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<JsonValue>,
}

impl CountArgs {
    pub fn filter(filter: JsonValue) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn query_parts(&self) -> QueryParts<'_> {
        QueryParts {
            filter: self.filter.as_ref(),
            order_by: self.order_by.as_ref(),
            cursor: self.cursor.as_ref(),
            take: self.take,
            skip: self.skip,
            distinct: None,
        }
    }
}

impl Args for CountArgs {}

projection!(FindUniqueArgs, FindManyArgs, CreateArgs, UpdateArgs, UpsertArgs, DeleteArgs);
