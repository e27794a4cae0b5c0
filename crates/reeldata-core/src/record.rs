// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw rows and the shaped records handed back to callers.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::error::DataError;
use crate::schema::Entity;
use crate::value::Value;

/// A full row of one entity: every scalar field, keyed by API name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&Value::Null)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.values.insert(field.into(), value);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// The primary key; empty when the row has none yet.
    pub fn id(&self) -> &str {
        self.get("id").as_str().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Records loaded through a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Box<ShapedRecord>>),
    Many(Vec<ShapedRecord>),
}

impl Related {
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::One(None) => JsonValue::Null,
            Self::One(Some(record)) => record.to_json(),
            Self::Many(records) => {
                JsonValue::Array(records.iter().map(ShapedRecord::to_json).collect())
            }
        }
    }
}

/// A record after projection and relation loading.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRecord {
    pub entity: Entity,
    pub fields: BTreeMap<String, Value>,
    pub relations: BTreeMap<String, Related>,
    /// Relation counts requested through `_count`.
    pub counts: Option<BTreeMap<String, u64>>,
}

impl ShapedRecord {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
            counts: None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(Value::as_str)
    }

    /// A loaded to-one relation; `None` when not loaded or absent.
    pub fn one(&self, relation: &str) -> Option<&ShapedRecord> {
        match self.relations.get(relation) {
            Some(Related::One(Some(record))) => Some(record),
            _ => None,
        }
    }

    /// A loaded to-many relation; `None` when not loaded.
    pub fn many(&self, relation: &str) -> Option<&[ShapedRecord]> {
        match self.relations.get(relation) {
            Some(Related::Many(records)) => Some(records),
            _ => None,
        }
    }

    pub fn count(&self, relation: &str) -> Option<u64> {
        self.counts.as_ref()?.get(relation).copied()
    }

    /// The record as a JSON object; relations nest, counts appear under `_count`.
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        for (name, value) in &self.fields {
            obj.insert(name.clone(), value.to_json());
        }
        for (name, related) in &self.relations {
            obj.insert(name.clone(), related.to_json());
        }
        if let Some(counts) = &self.counts {
            let counts = counts
                .iter()
                .map(|(k, v)| (k.clone(), JsonValue::from(*v)))
                .collect();
            obj.insert("_count".to_string(), JsonValue::Object(counts));
        }
        JsonValue::Object(obj)
    }

    /// Deserializes into a typed model such as [`crate::models::User`].
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T, DataError> {
        let entity = self.entity;
        serde_json::from_value(self.to_json()).map_err(|e| {
            DataError::Internal(format!("cannot convert {entity} record into model: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use serde_json::json;

    fn user_record() -> ShapedRecord {
        let mut record = ShapedRecord::new(Entity::User);
        let ts = Value::coerce(
            "User",
            "createdAt",
            crate::schema::ScalarType::DateTime,
            &json!("2026-01-01T00:00:00.000Z"),
        )
        .unwrap();
        for (k, v) in [
            ("id", Value::String("u1".into())),
            ("email", Value::String("a@x.com".into())),
            ("name", Value::Null),
            ("avatarUrl", Value::Null),
            ("subscriptionStatus", Value::Enum("FREE".into())),
            ("isDeleted", Value::Boolean(false)),
            ("deletedAt", Value::Null),
            ("createdAt", ts.clone()),
            ("updatedAt", ts),
        ] {
            record.fields.insert(k.to_string(), v);
        }
        record
    }

    #[test]
    fn shaped_record_converts_into_model() {
        let user: User = user_record().into_model().unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(user.name.is_none());
    }

    #[test]
    fn relations_and_counts_nest_in_json() {
        let mut record = user_record();
        record
            .relations
            .insert("videos".into(), Related::Many(Vec::new()));
        record.relations.insert("subscription".into(), Related::One(None));
        record.counts = Some(BTreeMap::from([("videos".to_string(), 0)]));
        let json = record.to_json();
        assert_eq!(json["videos"], json!([]));
        assert_eq!(json["subscription"], JsonValue::Null);
        assert_eq!(json["_count"]["videos"], json!(0));
    }

    #[test]
    fn missing_record_field_reads_as_null() {
        let record = Record::new();
        assert!(record.get("anything").is_null());
        assert_eq!(record.id(), "");
    }
}
