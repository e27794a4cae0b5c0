// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `_count`, `_avg`, `_sum`, `_min` and `_max`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::DataError;
use crate::query::args::AggregateFields;
use crate::record::Record;
use crate::schema::{EntitySchema, FieldDef, ScalarType};
use crate::value::{json_kind, Value};

/// Key under which `_count` reports the number of rows.
pub const COUNT_ALL: &str = "_all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
pub enum AggregateFn {
    #[strum(serialize = "_count")]
    Count,
    #[strum(serialize = "_avg")]
    Avg,
    #[strum(serialize = "_sum")]
    Sum,
    #[strum(serialize = "_min")]
    Min,
    #[strum(serialize = "_max")]
    Max,
}

impl AggregateFn {
    /// Checks that this aggregate applies to `field`.
    pub fn validate(self, schema: &EntitySchema, field: &FieldDef) -> Result<(), DataError> {
        let ok = match self {
            Self::Count => true,
            Self::Avg | Self::Sum => field.ty.is_numeric(),
            Self::Min | Self::Max => field.ty != ScalarType::Json,
        };
        if ok {
            Ok(())
        } else {
            Err(DataError::InvalidAggregateField {
                entity: schema.name(),
                field: field.name.to_string(),
                aggregate: self.to_string(),
            })
        }
    }

    /// Type of the aggregate's result over `field`.
    pub fn result_type(self, field: &FieldDef) -> ScalarType {
        match self {
            Self::Count => ScalarType::Int,
            Self::Avg => ScalarType::Decimal,
            Self::Sum | Self::Min | Self::Max => field.ty,
        }
    }

    /// Computes this aggregate of `field` over `rows`. Empty or all-null
    /// inputs give NULL, except `_count` which gives 0.
    pub fn compute(self, field: &str, rows: &[Record]) -> Result<Value, DataError> {
        let values = rows.iter().map(|r| r.get(field)).filter(|v| !v.is_null());
        match self {
            Self::Count => Ok(Value::Int(i64::try_from(values.count()).unwrap_or(i64::MAX))),
            Self::Min => Ok(values
                .min_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or(Value::Null)),
            Self::Max => Ok(values
                .max_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or(Value::Null)),
            Self::Sum => {
                let mut int_sum: Option<i128> = None;
                let mut dec_sum: Option<Decimal> = None;
                for v in values {
                    match v {
                        Value::Int(i) => *int_sum.get_or_insert(0) += i128::from(*i),
                        Value::Decimal(d) => {
                            let acc = dec_sum.get_or_insert(Decimal::ZERO);
                            *acc = acc.checked_add(*d).ok_or_else(|| overflow(field))?;
                        }
                        _ => {}
                    }
                }
                Ok(match (int_sum, dec_sum) {
                    (Some(s), _) => match i64::try_from(s) {
                        Ok(i) => Value::Int(i),
                        Err(_) => return Err(overflow(field)),
                    },
                    (None, Some(d)) => Value::Decimal(d),
                    (None, None) => Value::Null,
                })
            }
            Self::Avg => {
                let mut total = Decimal::ZERO;
                let mut n: u64 = 0;
                for v in values {
                    if let Some(d) = v.as_decimal() {
                        total = total.checked_add(d).ok_or_else(|| overflow(field))?;
                        n += 1;
                    }
                }
                if n == 0 {
                    return Ok(Value::Null);
                }
                let avg = total
                    .checked_div(Decimal::from(n))
                    .ok_or_else(|| overflow(field))?;
                Ok(Value::Decimal(avg.normalize()))
            }
        }
    }
}

fn overflow(field: &str) -> DataError {
    DataError::Internal(format!("aggregate over `{field}` overflowed"))
}

/// Validated aggregate selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateSpec {
    pub count_all: bool,
    /// Requested `(aggregate, field)` pairs, `_count` included.
    pub fields: Vec<(AggregateFn, String)>,
}

impl AggregateSpec {
    pub fn parse(schema: &EntitySchema, input: &AggregateFields) -> Result<Self, DataError> {
        let mut spec = Self::default();
        for func in AggregateFn::iter() {
            let raw = match func {
                AggregateFn::Count => &input.count,
                AggregateFn::Avg => &input.avg,
                AggregateFn::Sum => &input.sum,
                AggregateFn::Min => &input.min,
                AggregateFn::Max => &input.max,
            };
            let Some(raw) = raw else { continue };
            match (func, raw) {
                (AggregateFn::Count, JsonValue::Bool(all)) => spec.count_all |= *all,
                (_, JsonValue::Object(obj)) => {
                    for (key, flag) in obj {
                        let on = flag.as_bool().ok_or_else(|| {
                            DataError::shape(
                                schema.name(),
                                format!("{func}.{key} takes true or false, found {}", json_kind(flag)),
                            )
                        })?;
                        if !on {
                            continue;
                        }
                        if func == AggregateFn::Count && key == COUNT_ALL {
                            spec.count_all = true;
                            continue;
                        }
                        let field = schema.require_field(key)?;
                        func.validate(schema, field)?;
                        spec.fields.push((func, field.name.to_string()));
                    }
                }
                (_, other) => {
                    return Err(DataError::shape(
                        schema.name(),
                        format!("{func} takes an object of fields, found {}", json_kind(other)),
                    ));
                }
            }
        }
        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        !self.count_all && self.fields.is_empty()
    }

    pub fn compute(&self, rows: &[Record]) -> Result<AggregateResult, DataError> {
        let mut result = AggregateResult::default();
        if self.count_all {
            let n = u64::try_from(rows.len()).unwrap_or(u64::MAX);
            result
                .values
                .entry(AggregateFn::Count)
                .or_default()
                .insert(COUNT_ALL.to_string(), Value::Int(i64::try_from(n).unwrap_or(i64::MAX)));
        }
        for (func, field) in &self.fields {
            let value = func.compute(field, rows)?;
            result.values.entry(*func).or_default().insert(field.clone(), value);
        }
        Ok(result)
    }
}

/// Computed aggregates, keyed by function then field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult {
    pub values: BTreeMap<AggregateFn, BTreeMap<String, Value>>,
}

impl AggregateResult {
    pub fn get(&self, func: AggregateFn, field: &str) -> Option<&Value> {
        self.values.get(&func)?.get(field)
    }

    /// `_count._all`, when requested.
    pub fn count_all(&self) -> Option<i64> {
        self.get(AggregateFn::Count, COUNT_ALL)?.as_i64()
    }

    /// Writes `{"_avg": {...}, ...}` entries into `obj`.
    pub fn write_json(&self, obj: &mut Map<String, JsonValue>) {
        for (func, fields) in &self.values {
            let inner = fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect();
            obj.insert(func.to_string(), JsonValue::Object(inner));
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        self.write_json(&mut obj);
        JsonValue::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::tests::record;
    use crate::schema::{Entity, SchemaRegistry};
    use serde_json::json;

    fn fields(value: JsonValue) -> AggregateFields {
        serde_json::from_value(value).unwrap()
    }

    fn amounts(values: &[Option<&str>]) -> Vec<Record> {
        values
            .iter()
            .map(|v| {
                record(&[(
                    "amount",
                    v.map(|s| Value::Decimal(s.parse().unwrap())).unwrap_or(Value::Null),
                )])
            })
            .collect()
    }

    #[test]
    fn avg_on_string_is_invalid_aggregate_field() {
        let registry = SchemaRegistry::new();
        let err = AggregateSpec::parse(registry.get(Entity::Video), &fields(json!({"_avg": {"prompt": true}})))
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidAggregateField { .. }));
    }

    #[test]
    fn min_on_json_is_invalid_aggregate_field() {
        let registry = SchemaRegistry::new();
        let err = AggregateSpec::parse(registry.get(Entity::Video), &fields(json!({"_min": {"metadata": true}})))
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidAggregateField { .. }));
    }

    #[test]
    fn decimal_sum_and_avg_are_exact() {
        let rows = amounts(&[Some("0.1"), Some("0.2"), None]);
        assert_eq!(
            AggregateFn::Sum.compute("amount", &rows).unwrap(),
            Value::Decimal("0.3".parse().unwrap())
        );
        assert_eq!(
            AggregateFn::Avg.compute("amount", &rows).unwrap(),
            Value::Decimal("0.15".parse().unwrap())
        );
        assert_eq!(AggregateFn::Count.compute("amount", &rows).unwrap(), Value::Int(2));
    }

    #[test]
    fn empty_inputs_give_null_except_count() {
        let rows = amounts(&[None]);
        assert!(AggregateFn::Sum.compute("amount", &rows).unwrap().is_null());
        assert!(AggregateFn::Avg.compute("amount", &rows).unwrap().is_null());
        assert!(AggregateFn::Max.compute("amount", &[]).unwrap().is_null());
        assert_eq!(AggregateFn::Count.compute("amount", &[]).unwrap(), Value::Int(0));
    }

    #[test]
    fn int_avg_is_decimal() {
        let rows: Vec<Record> = [30, 60, 45]
            .iter()
            .map(|d| record(&[("duration", Value::Int(*d))]))
            .collect();
        assert_eq!(
            AggregateFn::Avg.compute("duration", &rows).unwrap(),
            Value::Decimal(Decimal::from(45))
        );
        assert_eq!(AggregateFn::Sum.compute("duration", &rows).unwrap(), Value::Int(135));
    }

    #[test]
    fn aggregate_selection_renders_underscore_keys() {
        let registry = SchemaRegistry::new();
        let spec = AggregateSpec::parse(
            registry.get(Entity::Video),
            &fields(json!({"_count": true, "_max": {"duration": true}})),
        )
        .unwrap();
        let rows: Vec<Record> = [30, 60]
            .iter()
            .map(|d| record(&[("duration", Value::Int(*d))]))
            .collect();
        let result = spec.compute(&rows).unwrap();
        assert_eq!(result.to_json(), json!({"_count": {"_all": 2}, "_max": {"duration": 60}}));
    }
}
