// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative filters compiled into evaluable predicates.
//!
//! A filter object is validated against the entity schema once, producing a
//! [`Filter`] tree. Evaluation follows SQL three-valued logic: a comparison
//! against a NULL column is *unknown* (`None`), and only rows that evaluate to
//! `Some(true)` match. This keeps `not: "x"` from matching NULL rows, exactly
//! as the store would.

use std::cmp::Ordering;

use serde_json::{Map, Value as JsonValue};

use crate::error::DataError;
use crate::record::Record;
use crate::schema::{EntitySchema, FieldDef, RelationDef, ScalarType, SchemaRegistry};
use crate::traits::RelationResolver;
use crate::value::{json_kind, NullSentinel, Value};

const JSON_OPERATORS: &[&str] = &[
    "path",
    "equals",
    "not",
    "mode",
    "string_contains",
    "string_starts_with",
    "string_ends_with",
    "array_contains",
    "array_starts_with",
    "array_ends_with",
];

const SCALAR_OPERATORS: &[&str] = &[
    "equals",
    "in",
    "notIn",
    "lt",
    "lte",
    "gt",
    "gte",
    "contains",
    "startsWith",
    "endsWith",
    "mode",
    "not",
];

/// String comparison mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Default,
    Insensitive,
}

/// A compiled filter over one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    /// Matches when none of the inner filters match.
    Not(Vec<Filter>),
    Scalar {
        field: String,
        condition: ScalarCondition,
    },
    Json {
        field: String,
        condition: JsonCondition,
    },
    ToOne {
        relation: RelationDef,
        condition: ToOneCondition,
    },
    ToMany {
        relation: RelationDef,
        quantifier: Quantifier,
        filter: Box<Filter>,
    },
}

/// `is` / `isNot` on a to-one relation; `None` tests for absence.
#[derive(Debug, Clone, PartialEq)]
pub enum ToOneCondition {
    Is(Option<Box<Filter>>),
    IsNot(Option<Box<Filter>>),
}

/// `some` / `every` / `none` on a to-many relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
    None,
}

/// Conjunction of scalar operators applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarCondition {
    pub ops: Vec<ScalarOp>,
    /// `None` inherits the enclosing condition's mode.
    pub mode: Option<QueryMode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarOp {
    Equals(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Not(Box<ScalarCondition>),
}

/// Operand of a JSON equality test.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonTarget {
    Value(JsonValue),
    Null(NullSentinel),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonOp {
    Equals(JsonTarget),
    Not(JsonTarget),
    StringContains(String),
    StringStartsWith(String),
    StringEndsWith(String),
    ArrayContains(JsonValue),
    ArrayStartsWith(JsonValue),
    ArrayEndsWith(JsonValue),
}

/// JSON operators applied at an optional path inside the document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonCondition {
    pub path: Vec<String>,
    pub ops: Vec<JsonOp>,
    pub mode: QueryMode,
}

impl Filter {
    /// Compiles a filter object for `schema`.
    pub fn parse(
        registry: &SchemaRegistry,
        schema: &EntitySchema,
        input: &JsonValue,
    ) -> Result<Self, DataError> {
        let obj = expect_object(schema, input, "filter")?;
        let mut parts = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            let part = match key.as_str() {
                "AND" => Self::And(parse_list(registry, schema, value)?),
                "OR" => Self::Or(parse_list(registry, schema, value)?),
                "NOT" => Self::Not(parse_list(registry, schema, value)?),
                _ => {
                    if let Some(field) = schema.field(key) {
                        parse_field(schema, field, value)?
                    } else if let Some(relation) = schema.relation(key) {
                        parse_relation(registry, schema, relation, value)?
                    } else {
                        return Err(DataError::shape(
                            schema.name(),
                            format!("unknown field `{key}` on {}", schema.entity),
                        ));
                    }
                }
            };
            parts.push(part);
        }
        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => Self::And(parts),
        })
    }

    /// Compiles a filter that must pin down a single row. Every key names a
    /// unique field and at least one of them is compared for equality.
    pub fn parse_unique(
        registry: &SchemaRegistry,
        schema: &EntitySchema,
        input: &JsonValue,
        operation: &str,
    ) -> Result<Self, DataError> {
        let keys: Vec<&str> = schema.unique_fields().map(|f| f.name).collect();
        if let JsonValue::Object(map) = input
            && let Some(other) = map.keys().find(|k| !keys.contains(&k.as_str()))
        {
            return Err(DataError::shape(
                schema.name(),
                format!(
                    "{operation} may only reference unique fields ({}), found `{other}`",
                    keys.join(", ")
                ),
            ));
        }
        let filter = Self::parse(registry, schema, input)?;
        if filter.unique_key(schema).is_none() {
            return Err(DataError::shape(
                schema.name(),
                format!(
                    "{operation} needs an equality on a unique field ({})",
                    keys.join(", ")
                ),
            ));
        }
        Ok(filter)
    }

    /// The first top-level equality on a unique field, if any.
    pub fn unique_key<'a>(&'a self, schema: &EntitySchema) -> Option<(&'a str, &'a Value)> {
        self.equalities()
            .into_iter()
            .find(|(field, _)| schema.field(field).is_some_and(|f| f.unique))
    }

    /// Top-level `field = value` conditions with a non-null value.
    pub fn equalities(&self) -> Vec<(&str, &Value)> {
        match self {
            Self::And(parts) => parts.iter().flat_map(Self::equalities).collect(),
            Self::Scalar { field, condition } => match condition.ops.as_slice() {
                [ScalarOp::Equals(value)]
                    if !value.is_null() && condition.mode != Some(QueryMode::Insensitive) =>
                {
                    vec![(field.as_str(), value)]
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Three-valued evaluation against `record`.
    pub fn eval(
        &self,
        record: &Record,
        resolver: &dyn RelationResolver,
    ) -> Result<Option<bool>, DataError> {
        match self {
            Self::And(parts) => {
                let mut acc = Some(true);
                for part in parts {
                    acc = and3(acc, part.eval(record, resolver)?);
                    if acc == Some(false) {
                        break;
                    }
                }
                Ok(acc)
            }
            Self::Or(parts) => {
                let mut acc = Some(false);
                for part in parts {
                    acc = or3(acc, part.eval(record, resolver)?);
                    if acc == Some(true) {
                        break;
                    }
                }
                Ok(acc)
            }
            Self::Not(parts) => {
                let mut acc = Some(true);
                for part in parts {
                    acc = and3(acc, part.eval(record, resolver)?.map(|b| !b));
                    if acc == Some(false) {
                        break;
                    }
                }
                Ok(acc)
            }
            Self::Scalar { field, condition } => Ok(condition.eval(record.get(field))),
            Self::Json { field, condition } => Ok(condition.eval(record.get(field))),
            Self::ToOne {
                relation,
                condition,
            } => {
                let related = resolver.load_related(relation, record)?;
                let first = related.first();
                Ok(Some(match condition {
                    ToOneCondition::Is(None) => first.is_none(),
                    ToOneCondition::IsNot(None) => first.is_some(),
                    ToOneCondition::Is(Some(filter)) => match first {
                        Some(r) => filter.matches(r, resolver)?,
                        None => false,
                    },
                    ToOneCondition::IsNot(Some(filter)) => match first {
                        Some(r) => !filter.matches(r, resolver)?,
                        None => true,
                    },
                }))
            }
            Self::ToMany {
                relation,
                quantifier,
                filter,
            } => {
                let related = resolver.load_related(relation, record)?;
                let mut matched = 0usize;
                for r in &related {
                    if filter.matches(r, resolver)? {
                        matched += 1;
                    }
                }
                Ok(Some(match quantifier {
                    Quantifier::Some => matched > 0,
                    Quantifier::Every => matched == related.len(),
                    Quantifier::None => matched == 0,
                }))
            }
        }
    }

    /// True when the filter evaluates to true (not false, not unknown).
    pub fn matches(
        &self,
        record: &Record,
        resolver: &dyn RelationResolver,
    ) -> Result<bool, DataError> {
        Ok(self.eval(record, resolver)? == Some(true))
    }
}

impl ScalarCondition {
    pub fn equals(value: Value) -> Self {
        Self {
            ops: vec![ScalarOp::Equals(value)],
            mode: None,
        }
    }

    pub fn eval(&self, value: &Value) -> Option<bool> {
        self.eval_in(value, QueryMode::Default)
    }

    fn eval_in(&self, value: &Value, inherited: QueryMode) -> Option<bool> {
        let mode = self.mode.unwrap_or(inherited);
        self.ops
            .iter()
            .fold(Some(true), |acc, op| and3(acc, op.eval(value, mode)))
    }
}

impl ScalarOp {
    fn eval(&self, value: &Value, mode: QueryMode) -> Option<bool> {
        match self {
            Self::Equals(Value::Null) => return Some(value.is_null()),
            Self::Not(inner) => return inner.eval_in(value, mode).map(|b| !b),
            _ if value.is_null() => return None,
            _ => {}
        }
        match self {
            Self::Equals(target) => Some(scalar_eq(value, target, mode)),
            Self::In(targets) => Some(targets.iter().any(|t| scalar_eq(value, t, mode))),
            Self::NotIn(targets) => Some(!targets.iter().any(|t| scalar_eq(value, t, mode))),
            Self::Lt(t) => scalar_cmp(value, t, mode).map(|o| o == Ordering::Less),
            Self::Lte(t) => scalar_cmp(value, t, mode).map(|o| o != Ordering::Greater),
            Self::Gt(t) => scalar_cmp(value, t, mode).map(|o| o == Ordering::Greater),
            Self::Gte(t) => scalar_cmp(value, t, mode).map(|o| o != Ordering::Less),
            Self::Contains(needle) => string_test(value, needle, mode, |h, n| h.contains(n)),
            Self::StartsWith(needle) => string_test(value, needle, mode, |h, n| h.starts_with(n)),
            Self::EndsWith(needle) => string_test(value, needle, mode, |h, n| h.ends_with(n)),
            Self::Not(_) => None,
        }
    }
}

/// Where the JSON path lands in a stored value.
enum Resolved<'a> {
    DbNull,
    Absent,
    Found(&'a JsonValue),
}

impl JsonCondition {
    pub fn eval(&self, value: &Value) -> Option<bool> {
        let resolved = self.resolve(value);
        self.ops
            .iter()
            .fold(Some(true), |acc, op| and3(acc, self.eval_op(op, &resolved)))
    }

    fn resolve<'a>(&self, value: &'a Value) -> Resolved<'a> {
        let Value::Json(doc) = value else {
            return Resolved::DbNull;
        };
        let mut current = doc;
        for segment in &self.path {
            let next = match current {
                JsonValue::Object(map) => map.get(segment),
                JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Resolved::Absent,
            }
        }
        Resolved::Found(current)
    }

    fn eval_op(&self, op: &JsonOp, resolved: &Resolved<'_>) -> Option<bool> {
        match op {
            JsonOp::Equals(target) => json_equals(target, resolved),
            JsonOp::Not(target) => json_equals(target, resolved).map(|b| !b),
            JsonOp::StringContains(needle) => self.json_string(resolved, needle, |h, n| h.contains(n)),
            JsonOp::StringStartsWith(needle) => {
                self.json_string(resolved, needle, |h, n| h.starts_with(n))
            }
            JsonOp::StringEndsWith(needle) => self.json_string(resolved, needle, |h, n| h.ends_with(n)),
            JsonOp::ArrayContains(needle) => json_array(resolved, |items| match needle {
                JsonValue::Array(wanted) => wanted.iter().all(|w| items.contains(w)),
                single => items.contains(single),
            }),
            JsonOp::ArrayStartsWith(needle) => json_array(resolved, |items| match needle {
                JsonValue::Array(prefix) => items.starts_with(prefix),
                single => items.first() == Some(single),
            }),
            JsonOp::ArrayEndsWith(needle) => json_array(resolved, |items| match needle {
                JsonValue::Array(suffix) => items.ends_with(suffix),
                single => items.last() == Some(single),
            }),
        }
    }

    fn json_string(
        &self,
        resolved: &Resolved<'_>,
        needle: &str,
        test: fn(&str, &str) -> bool,
    ) -> Option<bool> {
        match resolved {
            Resolved::Found(JsonValue::String(s)) => Some(match self.mode {
                QueryMode::Default => test(s, needle),
                QueryMode::Insensitive => test(&s.to_lowercase(), &needle.to_lowercase()),
            }),
            Resolved::Found(_) => Some(false),
            Resolved::DbNull | Resolved::Absent => None,
        }
    }
}

fn json_equals(target: &JsonTarget, resolved: &Resolved<'_>) -> Option<bool> {
    match (target, resolved) {
        (JsonTarget::Null(NullSentinel::DbNull), r) => {
            Some(matches!(r, Resolved::DbNull | Resolved::Absent))
        }
        (JsonTarget::Null(NullSentinel::JsonNull), r) => {
            Some(matches!(r, Resolved::Found(JsonValue::Null)))
        }
        (JsonTarget::Null(NullSentinel::AnyNull), r) => Some(matches!(
            r,
            Resolved::DbNull | Resolved::Absent | Resolved::Found(JsonValue::Null)
        )),
        (JsonTarget::Value(v), Resolved::Found(found)) => Some(*found == v),
        (JsonTarget::Value(_), _) => None,
    }
}

fn json_array(resolved: &Resolved<'_>, test: impl Fn(&[JsonValue]) -> bool) -> Option<bool> {
    match resolved {
        Resolved::Found(JsonValue::Array(items)) => Some(test(items)),
        Resolved::Found(_) => Some(false),
        Resolved::DbNull | Resolved::Absent => None,
    }
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn scalar_eq(value: &Value, target: &Value, mode: QueryMode) -> bool {
    match (mode, value, target) {
        (QueryMode::Insensitive, Value::String(a), Value::String(b)) => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => value.same_as(target),
    }
}

fn scalar_cmp(value: &Value, target: &Value, mode: QueryMode) -> Option<Ordering> {
    match (mode, value, target) {
        (QueryMode::Insensitive, Value::String(a), Value::String(b)) => {
            Some(a.to_lowercase().cmp(&b.to_lowercase()))
        }
        _ => value.compare(target),
    }
}

fn string_test(
    value: &Value,
    needle: &str,
    mode: QueryMode,
    test: fn(&str, &str) -> bool,
) -> Option<bool> {
    let haystack = value.as_str()?;
    Some(match mode {
        QueryMode::Default => test(haystack, needle),
        QueryMode::Insensitive => test(&haystack.to_lowercase(), &needle.to_lowercase()),
    })
}

fn expect_object<'a>(
    schema: &EntitySchema,
    input: &'a JsonValue,
    what: &str,
) -> Result<&'a Map<String, JsonValue>, DataError> {
    input.as_object().ok_or_else(|| {
        DataError::shape(
            schema.name(),
            format!("{what} must be an object, found {}", json_kind(input)),
        )
    })
}

fn parse_list(
    registry: &SchemaRegistry,
    schema: &EntitySchema,
    value: &JsonValue,
) -> Result<Vec<Filter>, DataError> {
    match value {
        JsonValue::Array(items) => items
            .iter()
            .map(|item| Filter::parse(registry, schema, item))
            .collect(),
        JsonValue::Object(_) => Ok(vec![Filter::parse(registry, schema, value)?]),
        other => Err(DataError::shape(
            schema.name(),
            format!(
                "logical operators take an object or an array, found {}",
                json_kind(other)
            ),
        )),
    }
}

fn parse_field(
    schema: &EntitySchema,
    field: &FieldDef,
    value: &JsonValue,
) -> Result<Filter, DataError> {
    if field.ty == ScalarType::Json {
        let obj = match value {
            JsonValue::Object(obj) if NullSentinel::from_json(value).is_none() => obj,
            _ => {
                return Err(DataError::shape(
                    schema.name(),
                    format!(
                        "Json field `{}` must be filtered with an operator object such as {{\"equals\": ...}}",
                        field.name
                    ),
                ));
            }
        };
        return Ok(Filter::Json {
            field: field.name.to_string(),
            condition: parse_json_condition(schema, field, obj)?,
        });
    }
    let condition = match value {
        JsonValue::Object(obj) => parse_scalar_condition(schema, field, obj)?,
        direct => ScalarCondition::equals(operand(schema, field, direct)?),
    };
    Ok(Filter::Scalar {
        field: field.name.to_string(),
        condition,
    })
}

/// Parses an operator object for a scalar field. Also used by `having`
/// clauses with a synthetic field describing the aggregate's result type.
pub fn parse_scalar_condition(
    schema: &EntitySchema,
    field: &FieldDef,
    obj: &Map<String, JsonValue>,
) -> Result<ScalarCondition, DataError> {
    let mut ops = Vec::with_capacity(obj.len());
    let mut mode = None;
    for (key, value) in obj {
        let op = match key.as_str() {
            "equals" => ScalarOp::Equals(operand(schema, field, value)?),
            "in" => ScalarOp::In(operand_list(schema, field, value)?),
            "notIn" => ScalarOp::NotIn(operand_list(schema, field, value)?),
            "lt" | "lte" | "gt" | "gte" => {
                if !field.ty.is_orderable() {
                    return Err(DataError::mismatch(
                        schema.name(),
                        field.name,
                        format!("an orderable field for `{key}`"),
                        field.ty.to_string(),
                    ));
                }
                let v = non_null_operand(schema, field, key, value)?;
                match key.as_str() {
                    "lt" => ScalarOp::Lt(v),
                    "lte" => ScalarOp::Lte(v),
                    "gt" => ScalarOp::Gt(v),
                    _ => ScalarOp::Gte(v),
                }
            }
            "contains" | "startsWith" | "endsWith" => {
                require_string(schema, field, key)?;
                let needle = value
                    .as_str()
                    .ok_or_else(|| {
                        DataError::mismatch(schema.name(), field.name, "String", json_kind(value))
                    })?
                    .to_string();
                match key.as_str() {
                    "contains" => ScalarOp::Contains(needle),
                    "startsWith" => ScalarOp::StartsWith(needle),
                    _ => ScalarOp::EndsWith(needle),
                }
            }
            "mode" => {
                require_string(schema, field, key)?;
                mode = Some(parse_mode(schema, value)?);
                continue;
            }
            "not" => match value {
                JsonValue::Object(inner) => {
                    ScalarOp::Not(Box::new(parse_scalar_condition(schema, field, inner)?))
                }
                direct => ScalarOp::Not(Box::new(ScalarCondition::equals(operand(
                    schema, field, direct,
                )?))),
            },
            other if JSON_OPERATORS.contains(&other) => {
                return Err(DataError::mismatch(
                    schema.name(),
                    field.name,
                    "a Json field",
                    format!("{} field with `{other}`", field.ty),
                ));
            }
            other => {
                return Err(DataError::shape(
                    schema.name(),
                    format!("unknown operator `{other}` on {}", field.name),
                ));
            }
        };
        ops.push(op);
    }
    Ok(ScalarCondition { ops, mode })
}

fn parse_json_condition(
    schema: &EntitySchema,
    field: &FieldDef,
    obj: &Map<String, JsonValue>,
) -> Result<JsonCondition, DataError> {
    let mut condition = JsonCondition {
        path: Vec::new(),
        ops: Vec::new(),
        mode: QueryMode::Default,
    };
    for (key, value) in obj {
        match key.as_str() {
            "path" => {
                condition.path = match value {
                    JsonValue::String(s) => vec![s.clone()],
                    JsonValue::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            JsonValue::String(s) => Ok(s.clone()),
                            JsonValue::Number(n) => Ok(n.to_string()),
                            other => Err(DataError::shape(
                                schema.name(),
                                format!("path segments must be strings, found {}", json_kind(other)),
                            )),
                        })
                        .collect::<Result<_, _>>()?,
                    other => {
                        return Err(DataError::shape(
                            schema.name(),
                            format!("path must be an array of keys, found {}", json_kind(other)),
                        ));
                    }
                }
            }
            "equals" => condition
                .ops
                .push(JsonOp::Equals(json_target(schema, field, value)?)),
            "not" => condition
                .ops
                .push(JsonOp::Not(json_target(schema, field, value)?)),
            "mode" => condition.mode = parse_mode(schema, value)?,
            "string_contains" | "string_starts_with" | "string_ends_with" => {
                let needle = value
                    .as_str()
                    .ok_or_else(|| {
                        DataError::mismatch(schema.name(), field.name, "String", json_kind(value))
                    })?
                    .to_string();
                condition.ops.push(match key.as_str() {
                    "string_contains" => JsonOp::StringContains(needle),
                    "string_starts_with" => JsonOp::StringStartsWith(needle),
                    _ => JsonOp::StringEndsWith(needle),
                });
            }
            "array_contains" | "array_starts_with" | "array_ends_with" => {
                if value.is_null() {
                    return Err(DataError::mismatch(
                        schema.name(),
                        field.name,
                        "a JSON value",
                        "null",
                    ));
                }
                let needle = value.clone();
                condition.ops.push(match key.as_str() {
                    "array_contains" => JsonOp::ArrayContains(needle),
                    "array_starts_with" => JsonOp::ArrayStartsWith(needle),
                    _ => JsonOp::ArrayEndsWith(needle),
                });
            }
            other if SCALAR_OPERATORS.contains(&other) => {
                return Err(DataError::mismatch(
                    schema.name(),
                    field.name,
                    "a scalar field",
                    format!("Json field with `{other}`"),
                ));
            }
            other => {
                return Err(DataError::shape(
                    schema.name(),
                    format!("unknown Json operator `{other}` on {}", field.name),
                ));
            }
        }
    }
    Ok(condition)
}

fn json_target(
    schema: &EntitySchema,
    field: &FieldDef,
    value: &JsonValue,
) -> Result<JsonTarget, DataError> {
    if let Some(sentinel) = NullSentinel::from_json(value) {
        return Ok(JsonTarget::Null(sentinel));
    }
    if value.is_null() {
        return Err(DataError::mismatch(
            schema.name(),
            field.name,
            "a JSON value or a DbNull/JsonNull/AnyNull sentinel",
            "bare null",
        ));
    }
    Ok(JsonTarget::Value(value.clone()))
}

fn parse_relation(
    registry: &SchemaRegistry,
    schema: &EntitySchema,
    relation: &RelationDef,
    value: &JsonValue,
) -> Result<Filter, DataError> {
    let target = registry.get(relation.target);
    if relation.is_many() {
        let obj = expect_object(schema, value, "to-many relation filter")?;
        let mut parts = Vec::with_capacity(obj.len());
        for (key, inner) in obj {
            let quantifier = match key.as_str() {
                "some" => Quantifier::Some,
                "every" => Quantifier::Every,
                "none" => Quantifier::None,
                other => {
                    return Err(DataError::shape(
                        schema.name(),
                        format!(
                            "relation `{}` takes some/every/none, found `{other}`",
                            relation.name
                        ),
                    ));
                }
            };
            parts.push(Filter::ToMany {
                relation: relation.clone(),
                quantifier,
                filter: Box::new(Filter::parse(registry, target, inner)?),
            });
        }
        return Ok(match parts.len() {
            1 => parts.remove(0),
            _ => Filter::And(parts),
        });
    }

    let nested = |inner: &JsonValue| -> Result<Option<Box<Filter>>, DataError> {
        if inner.is_null() {
            Ok(None)
        } else {
            Ok(Some(Box::new(Filter::parse(registry, target, inner)?)))
        }
    };
    let to_one = |condition| Filter::ToOne {
        relation: relation.clone(),
        condition,
    };
    match value {
        JsonValue::Null => Ok(to_one(ToOneCondition::Is(None))),
        JsonValue::Object(obj)
            if !obj.is_empty() && obj.keys().all(|k| k == "is" || k == "isNot") =>
        {
            let mut parts = Vec::with_capacity(obj.len());
            for (key, inner) in obj {
                parts.push(to_one(if key == "is" {
                    ToOneCondition::Is(nested(inner)?)
                } else {
                    ToOneCondition::IsNot(nested(inner)?)
                }));
            }
            Ok(match parts.len() {
                1 => parts.remove(0),
                _ => Filter::And(parts),
            })
        }
        other => Ok(to_one(ToOneCondition::Is(nested(other)?))),
    }
}

fn operand(schema: &EntitySchema, field: &FieldDef, value: &JsonValue) -> Result<Value, DataError> {
    if value.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err(DataError::mismatch(
                schema.name(),
                field.name,
                field.ty.to_string(),
                "null on a required field",
            ))
        };
    }
    Value::coerce(&schema.name(), field.name, field.ty, value)
}

fn non_null_operand(
    schema: &EntitySchema,
    field: &FieldDef,
    op: &str,
    value: &JsonValue,
) -> Result<Value, DataError> {
    if value.is_null() {
        return Err(DataError::mismatch(
            schema.name(),
            field.name,
            format!("a {} operand for `{op}`", field.ty),
            "null",
        ));
    }
    Value::coerce(&schema.name(), field.name, field.ty, value)
}

fn operand_list(
    schema: &EntitySchema,
    field: &FieldDef,
    value: &JsonValue,
) -> Result<Vec<Value>, DataError> {
    let items = value.as_array().ok_or_else(|| {
        DataError::mismatch(
            schema.name(),
            field.name,
            "an array of values",
            json_kind(value),
        )
    })?;
    items
        .iter()
        .map(|item| non_null_operand(schema, field, "in", item))
        .collect()
}

fn require_string(schema: &EntitySchema, field: &FieldDef, op: &str) -> Result<(), DataError> {
    if field.ty == ScalarType::String {
        Ok(())
    } else {
        Err(DataError::mismatch(
            schema.name(),
            field.name,
            format!("a String field for `{op}`"),
            field.ty.to_string(),
        ))
    }
}

fn parse_mode(schema: &EntitySchema, value: &JsonValue) -> Result<QueryMode, DataError> {
    match value.as_str() {
        Some("default") => Ok(QueryMode::Default),
        Some("insensitive") => Ok(QueryMode::Insensitive),
        _ => Err(DataError::shape(
            schema.name(),
            format!("mode must be \"default\" or \"insensitive\", found {value}"),
        )),
    }
}
