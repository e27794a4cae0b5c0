// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Field and relation descriptors.

use std::fmt;

use super::Entity;

/// Storage type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    Boolean,
    DateTime,
    Decimal,
    /// A closed set of string values.
    Enum {
        name: &'static str,
        variants: &'static [&'static str],
    },
    Json,
}

impl ScalarType {
    /// Numeric types accept `_avg`/`_sum` and arithmetic updates.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Decimal)
    }

    /// Types with a total order usable by `lt`/`gt` and `_min`/`_max`.
    pub fn is_orderable(&self) -> bool {
        matches!(self, Self::String | Self::Int | Self::DateTime | Self::Decimal)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("String"),
            Self::Int => f.write_str("Int"),
            Self::Boolean => f.write_str("Boolean"),
            Self::DateTime => f.write_str("DateTime"),
            Self::Decimal => f.write_str("Decimal"),
            Self::Enum { name, .. } => write!(f, "enum {name}"),
            Self::Json => f.write_str("Json"),
        }
    }
}

/// Value filled in when a create omits the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// A fresh UUID v4 string.
    Uuid,
    /// The operation's timestamp.
    Now,
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

/// A scalar column of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// API name (camelCase).
    pub name: &'static str,
    /// Column name in the store (snake_case).
    pub column: &'static str,
    pub ty: ScalarType,
    pub nullable: bool,
    pub unique: bool,
    pub id: bool,
    pub default: Option<DefaultValue>,
    /// Refreshed with the operation timestamp on every update.
    pub updated_at: bool,
}

impl FieldDef {
    pub fn new(name: &'static str, column: &'static str, ty: ScalarType) -> Self {
        Self {
            name,
            column,
            ty,
            nullable: false,
            unique: false,
            id: false,
            default: None,
            updated_at: false,
        }
    }

    /// The primary key: a unique string defaulting to a UUID.
    pub fn id() -> Self {
        Self {
            id: true,
            unique: true,
            default: Some(DefaultValue::Uuid),
            ..Self::new("id", "id", ScalarType::String)
        }
    }

    pub fn optional(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn updated_at(mut self) -> Self {
        self.updated_at = true;
        self.default = Some(DefaultValue::Now);
        self
    }

    /// Whether a create must supply this field explicitly.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

/// Whether a relation points at one record or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// What happens to the owning rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

/// A relation field of an entity.
///
/// The owning side stores the foreign key in `local_field` and references
/// `foreign_field` (always `id`) on the target. The inverse side pairs its own
/// `id` (`local_field`) with the target's foreign key (`foreign_field`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub source: Entity,
    pub target: Entity,
    pub cardinality: Cardinality,
    /// Only meaningful for to-one relations.
    pub nullable: bool,
    pub owning: bool,
    pub local_field: &'static str,
    pub foreign_field: &'static str,
    pub on_delete: OnDelete,
}

impl RelationDef {
    /// Owning to-one side: `source.local_field` references `target.id`.
    pub fn belongs_to(
        name: &'static str,
        source: Entity,
        target: Entity,
        foreign_key: &'static str,
        on_delete: OnDelete,
    ) -> Self {
        Self {
            name,
            source,
            target,
            cardinality: Cardinality::One,
            nullable: on_delete == OnDelete::SetNull,
            owning: true,
            local_field: foreign_key,
            foreign_field: "id",
            on_delete,
        }
    }

    /// Inverse to-many side: `target.foreign_key` references `source.id`.
    pub fn has_many(
        name: &'static str,
        source: Entity,
        target: Entity,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            source,
            target,
            cardinality: Cardinality::Many,
            nullable: false,
            owning: false,
            local_field: "id",
            foreign_field: foreign_key,
            on_delete: OnDelete::Cascade,
        }
    }

    /// Inverse optional to-one side, backed by a unique foreign key on the target.
    pub fn has_one(
        name: &'static str,
        source: Entity,
        target: Entity,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            cardinality: Cardinality::One,
            nullable: true,
            ..Self::has_many(name, source, target, foreign_key)
        }
    }

    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }
}
