// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of entity schemas, built once and shared read-only.

use std::collections::HashMap;
use std::str::FromStr;

use strum::IntoEnumIterator;

use super::definitions;
use super::{Entity, FieldDef, RelationDef};
use crate::error::DataError;

/// Scalar fields and relations of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub entity: Entity,
    pub table: &'static str,
    pub fields: Vec<FieldDef>,
    pub relations: Vec<RelationDef>,
}

impl EntitySchema {
    /// Entity name as used in errors and logs.
    pub fn name(&self) -> String {
        self.entity.to_string()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Like [`field`](Self::field) but fails with `InvalidFilterShape`.
    pub fn require_field(&self, name: &str) -> Result<&FieldDef, DataError> {
        self.field(name).ok_or_else(|| {
            DataError::shape(
                self.name(),
                format!("unknown field `{name}` on {}", self.entity),
            )
        })
    }

    pub fn id_field(&self) -> &FieldDef {
        // Every definition starts with FieldDef::id().
        &self.fields[0]
    }

    /// Fields usable as a unique lookup key (the id and every unique column).
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// The field holding `column`, used to translate store constraint messages.
    pub fn field_by_column(&self, column: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.column == column)
    }

    /// Names of all scalar fields, in declaration order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

/// Immutable lookup of every entity schema.
///
/// Constructed explicitly and passed to whoever needs it; there is no global
/// instance.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<Entity, EntitySchema>,
}

impl SchemaRegistry {
    /// Builds the registry with all seven entity definitions.
    pub fn new() -> Self {
        let schemas = Entity::iter()
            .map(|entity| (entity, definitions::schema_for(entity)))
            .collect();
        Self { schemas }
    }

    /// Looks up an entity by its name, failing with `UnknownEntity`.
    pub fn describe(&self, name: &str) -> Result<&EntitySchema, DataError> {
        let entity = Entity::from_str(name).map_err(|_| DataError::UnknownEntity {
            name: name.to_string(),
        })?;
        Ok(self.get(entity))
    }

    /// Looks up an entity that is known to exist.
    pub fn get(&self, entity: Entity) -> &EntitySchema {
        // `new` registers every variant of `Entity`.
        &self.schemas[&entity]
    }

    /// All schemas in declaration order of [`Entity`].
    pub fn all(&self) -> impl Iterator<Item = &EntitySchema> {
        Entity::iter().map(|e| self.get(e))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
