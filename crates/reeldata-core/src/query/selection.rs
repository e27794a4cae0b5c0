// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled `select` / `include` / `omit` projections.

use serde_json::{Map, Value as JsonValue};

use crate::error::DataError;
use crate::query::args::Projection;
use crate::query::filter::Filter;
use crate::query::pipeline::{FindQuery, QueryParts};
use crate::schema::{EntitySchema, RelationDef, SchemaRegistry};
use crate::value::json_kind;

/// Which scalar fields appear in the result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScalarSelection {
    #[default]
    All,
    Only(Vec<String>),
    Except(Vec<String>),
}

impl ScalarSelection {
    pub fn admits(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.iter().any(|f| f == field),
            Self::Except(fields) => !fields.iter().any(|f| f == field),
        }
    }
}

/// A relation loaded into the result, with its own query and projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSelection {
    pub relation: RelationDef,
    /// Only meaningful for to-many relations.
    pub query: FindQuery,
    pub selection: Selection,
}

/// One `_count` entry: a to-many relation and an optional filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CountSelection {
    pub relation: RelationDef,
    pub filter: Option<Filter>,
}

/// Projection of one result level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub scalars: ScalarSelection,
    pub relations: Vec<RelationSelection>,
    pub counts: Option<Vec<CountSelection>>,
}

impl Selection {
    /// All scalar fields, no relations.
    pub fn scalars_only() -> Self {
        Self::default()
    }

    /// Compiles a projection. `select` with `omit`, `select` with `include`,
    /// and a key both included and omitted are rejected.
    pub fn parse(
        registry: &SchemaRegistry,
        schema: &EntitySchema,
        projection: Projection<'_>,
    ) -> Result<Self, DataError> {
        if projection.select.is_some() && projection.omit.is_some() {
            return Err(DataError::ConflictingSelectOmit {
                entity: schema.name(),
                detail: "select and omit cannot be combined".into(),
            });
        }
        if projection.select.is_some() && projection.include.is_some() {
            return Err(DataError::ConflictingSelectInclude {
                entity: schema.name(),
            });
        }

        let mut selection = Self::default();
        if let Some(select) = projection.select {
            let mut only = Vec::new();
            for (key, value) in object(schema, select, "select")? {
                if key == "_count" {
                    selection.counts = parse_counts(registry, schema, value)?;
                } else if let Some(field) = schema.field(key) {
                    if flag(schema, key, value)? {
                        only.push(field.name.to_string());
                    }
                } else if let Some(relation) = schema.relation(key) {
                    if let Some(rs) = parse_relation(registry, schema, relation, value)? {
                        selection.relations.push(rs);
                    }
                } else {
                    return Err(unknown(schema, key, "select"));
                }
            }
            selection.scalars = ScalarSelection::Only(only);
            return Ok(selection);
        }

        let include = projection
            .include
            .map(|i| object(schema, i, "include"))
            .transpose()?;
        if let Some(include) = include {
            for (key, value) in include {
                if key == "_count" {
                    selection.counts = parse_counts(registry, schema, value)?;
                } else if let Some(relation) = schema.relation(key) {
                    if let Some(rs) = parse_relation(registry, schema, relation, value)? {
                        selection.relations.push(rs);
                    }
                } else if schema.field(key).is_some() {
                    return Err(DataError::shape(
                        schema.name(),
                        format!("include takes relations only; `{key}` is a scalar field"),
                    ));
                } else {
                    return Err(unknown(schema, key, "include"));
                }
            }
        }

        if let Some(omit) = projection.omit {
            let mut except = Vec::new();
            for (key, value) in object(schema, omit, "omit")? {
                if !flag(schema, key, value)? {
                    continue;
                }
                let included = include
                    .and_then(|i| i.get(key))
                    .is_some_and(|v| v != &JsonValue::Bool(false));
                if included {
                    return Err(DataError::ConflictingSelectOmit {
                        entity: schema.name(),
                        detail: format!("`{key}` is both included and omitted"),
                    });
                }
                match schema.field(key) {
                    Some(field) => except.push(field.name.to_string()),
                    None if schema.relation(key).is_some() => {
                        return Err(DataError::shape(
                            schema.name(),
                            format!("omit takes scalar fields only; `{key}` is a relation"),
                        ));
                    }
                    None => return Err(unknown(schema, key, "omit")),
                }
            }
            selection.scalars = ScalarSelection::Except(except);
        }
        Ok(selection)
    }
}

fn object<'a>(
    schema: &EntitySchema,
    value: &'a JsonValue,
    what: &str,
) -> Result<&'a Map<String, JsonValue>, DataError> {
    value.as_object().ok_or_else(|| {
        DataError::shape(
            schema.name(),
            format!("{what} must be an object, found {}", json_kind(value)),
        )
    })
}

fn flag(schema: &EntitySchema, key: &str, value: &JsonValue) -> Result<bool, DataError> {
    value.as_bool().ok_or_else(|| {
        DataError::shape(
            schema.name(),
            format!("`{key}` takes true or false, found {}", json_kind(value)),
        )
    })
}

fn unknown(schema: &EntitySchema, key: &str, what: &str) -> DataError {
    DataError::shape(
        schema.name(),
        format!("unknown field `{key}` in {what} on {}", schema.entity),
    )
}

/// `true`, `false` or a nested argument object for one relation.
fn parse_relation(
    registry: &SchemaRegistry,
    schema: &EntitySchema,
    relation: &RelationDef,
    value: &JsonValue,
) -> Result<Option<RelationSelection>, DataError> {
    let target = registry.get(relation.target);
    let nested = match value {
        JsonValue::Bool(false) => return Ok(None),
        JsonValue::Bool(true) => {
            return Ok(Some(RelationSelection {
                relation: relation.clone(),
                query: FindQuery::default(),
                selection: Selection::default(),
            }));
        }
        JsonValue::Object(obj) => obj,
        other => {
            return Err(DataError::shape(
                schema.name(),
                format!(
                    "`{}` takes true, false or an argument object, found {}",
                    relation.name,
                    json_kind(other)
                ),
            ));
        }
    };

    const PROJECTION_KEYS: [&str; 3] = ["select", "include", "omit"];
    const QUERY_KEYS: [&str; 6] = ["where", "orderBy", "cursor", "take", "skip", "distinct"];
    for key in nested.keys() {
        let allowed = PROJECTION_KEYS.contains(&key.as_str())
            || (relation.is_many() && QUERY_KEYS.contains(&key.as_str()));
        if !allowed {
            return Err(DataError::shape(
                schema.name(),
                format!("`{key}` is not accepted on relation `{}`", relation.name),
            ));
        }
    }

    let take = nested
        .get("take")
        .map(|v| {
            v.as_i64()
                .ok_or_else(|| DataError::shape(schema.name(), "take must be an integer"))
        })
        .transpose()?;
    let skip = nested
        .get("skip")
        .map(|v| {
            v.as_u64()
                .ok_or_else(|| DataError::shape(schema.name(), "skip must be a non-negative integer"))
        })
        .transpose()?;
    let distinct: Option<Vec<String>> = nested
        .get("distinct")
        .map(|v| {
            v.as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|i| i.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| DataError::shape(schema.name(), "distinct must be an array of field names"))
        })
        .transpose()?;

    let query = FindQuery::compile(
        registry,
        target,
        QueryParts {
            filter: nested.get("where"),
            order_by: nested.get("orderBy"),
            cursor: nested.get("cursor"),
            take,
            skip,
            distinct: distinct.as_deref(),
        },
    )?;
    let selection = Selection::parse(
        registry,
        target,
        Projection {
            select: nested.get("select"),
            include: nested.get("include"),
            omit: nested.get("omit"),
        },
    )?;
    Ok(Some(RelationSelection {
        relation: relation.clone(),
        query,
        selection,
    }))
}

/// `_count: true` counts every to-many relation; `{select: {rel: true |
/// {where}}}` picks relations and optionally filters them.
fn parse_counts(
    registry: &SchemaRegistry,
    schema: &EntitySchema,
    value: &JsonValue,
) -> Result<Option<Vec<CountSelection>>, DataError> {
    let to_many = |relation: &RelationDef| {
        if relation.is_many() {
            Ok(())
        } else {
            Err(DataError::shape(
                schema.name(),
                format!("_count applies to to-many relations; `{}` is to-one", relation.name),
            ))
        }
    };
    match value {
        JsonValue::Bool(false) => Ok(None),
        JsonValue::Bool(true) => Ok(Some(
            schema
                .relations
                .iter()
                .filter(|r| r.is_many())
                .map(|r| CountSelection {
                    relation: r.clone(),
                    filter: None,
                })
                .collect(),
        )),
        JsonValue::Object(obj) => {
            let select = match (obj.len(), obj.get("select")) {
                (1, Some(select)) => object(schema, select, "_count.select")?,
                _ => {
                    return Err(DataError::shape(
                        schema.name(),
                        "_count takes true or {\"select\": {...}}",
                    ));
                }
            };
            let mut counts = Vec::new();
            for (key, entry) in select {
                let relation = schema
                    .relation(key)
                    .ok_or_else(|| unknown(schema, key, "_count"))?;
                to_many(relation)?;
                let filter = match entry {
                    JsonValue::Bool(false) => continue,
                    JsonValue::Bool(true) => None,
                    JsonValue::Object(args) => match (args.len(), args.get("where")) {
                        (1, Some(filter)) => {
                            Some(Filter::parse(registry, registry.get(relation.target), filter)?)
                        }
                        _ => {
                            return Err(DataError::shape(
                                schema.name(),
                                "_count relation entries take true or {\"where\": {...}}",
                            ));
                        }
                    },
                    other => {
                        return Err(DataError::shape(
                            schema.name(),
                            format!("`{key}` in _count takes true or an object, found {}", json_kind(other)),
                        ));
                    }
                };
                counts.push(CountSelection {
                    relation: relation.clone(),
                    filter,
                });
            }
            Ok(Some(counts))
        }
        other => Err(DataError::shape(
            schema.name(),
            format!("_count takes true or an object, found {}", json_kind(other)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Entity;
    use serde_json::json;

    fn parse(
        entity: Entity,
        select: Option<JsonValue>,
        include: Option<JsonValue>,
        omit: Option<JsonValue>,
    ) -> Result<Selection, DataError> {
        let registry = SchemaRegistry::new();
        Selection::parse(
            &registry,
            registry.get(entity),
            Projection {
                select: select.as_ref(),
                include: include.as_ref(),
                omit: omit.as_ref(),
            },
        )
    }

    #[test]
    fn select_and_omit_conflict() {
        let err = parse(Entity::User, Some(json!({"email": true})), None, Some(json!({"name": true})))
            .unwrap_err();
        assert!(matches!(err, DataError::ConflictingSelectOmit { .. }));
    }

    #[test]
    fn select_and_include_conflict() {
        let err = parse(Entity::User, Some(json!({"email": true})), Some(json!({"videos": true})), None)
            .unwrap_err();
        assert!(matches!(err, DataError::ConflictingSelectInclude { .. }));
    }

    #[test]
    fn include_and_omit_same_key_conflict() {
        let err = parse(Entity::User, None, Some(json!({"videos": true})), Some(json!({"videos": true})))
            .unwrap_err();
        assert!(matches!(err, DataError::ConflictingSelectOmit { .. }));
    }

    #[test]
    fn include_with_omit_of_other_fields_is_fine() {
        let sel = parse(Entity::User, None, Some(json!({"videos": true})), Some(json!({"email": true})))
            .unwrap();
        assert!(!sel.scalars.admits("email"));
        assert!(sel.scalars.admits("name"));
        assert_eq!(sel.relations.len(), 1);
    }

    #[test]
    fn select_picks_scalars_relations_and_counts() {
        let sel = parse(
            Entity::User,
            Some(json!({
                "email": true,
                "name": false,
                "videos": {"where": {"status": "COMPLETED"}, "take": 2, "select": {"id": true}},
                "_count": {"select": {"sessions": true, "videos": {"where": {"status": "FAILED"}}}}
            })),
            None,
            None,
        )
        .unwrap();
        assert_eq!(sel.scalars, ScalarSelection::Only(vec!["email".into()]));
        let videos = &sel.relations[0];
        assert_eq!(videos.query.take, Some(2));
        assert!(videos.query.filter.is_some());
        let counts = sel.counts.unwrap();
        assert_eq!(counts.len(), 2);
        assert!(counts.iter().any(|c| c.relation.name == "videos" && c.filter.is_some()));
    }

    #[test]
    fn to_one_relation_rejects_query_arguments() {
        let err = parse(
            Entity::Subscription,
            None,
            Some(json!({"user": {"take": 1}})),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidFilterShape { .. }));
    }

    #[test]
    fn count_on_to_one_relation_is_rejected() {
        let err = parse(
            Entity::Video,
            None,
            Some(json!({"_count": {"select": {"user": true}}})),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidFilterShape { .. }));
    }

    #[test]
    fn include_rejects_scalar_fields() {
        assert!(parse(Entity::User, None, Some(json!({"email": true})), None).is_err());
    }
}
