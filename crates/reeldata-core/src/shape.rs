// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result shaper: projection, relation loading and relation counts.

use std::collections::BTreeMap;

use crate::error::DataError;
use crate::query::selection::Selection;
use crate::record::{Record, Related, ShapedRecord};
use crate::schema::{Entity, SchemaRegistry};
use crate::traits::RelationResolver;

/// Turns raw rows into [`ShapedRecord`]s according to a [`Selection`].
pub struct Shaper<'a> {
    registry: &'a SchemaRegistry,
    resolver: &'a dyn RelationResolver,
}

impl<'a> Shaper<'a> {
    pub fn new(registry: &'a SchemaRegistry, resolver: &'a dyn RelationResolver) -> Self {
        Self { registry, resolver }
    }

    pub fn shape(
        &self,
        entity: Entity,
        record: &Record,
        selection: &Selection,
    ) -> Result<ShapedRecord, DataError> {
        let schema = self.registry.get(entity);
        let mut shaped = ShapedRecord::new(entity);
        for field in &schema.fields {
            if selection.scalars.admits(field.name) {
                shaped
                    .fields
                    .insert(field.name.to_string(), record.get(field.name).clone());
            }
        }

        for rs in &selection.relations {
            let related = self.resolver.load_related(&rs.relation, record)?;
            let target = rs.relation.target;
            let value = if rs.relation.is_many() {
                let rows = rs.query.run(related, self.resolver)?;
                Related::Many(
                    rows.iter()
                        .map(|r| self.shape(target, r, &rs.selection))
                        .collect::<Result<_, _>>()?,
                )
            } else {
                match related.first() {
                    Some(r) => Related::One(Some(Box::new(self.shape(target, r, &rs.selection)?))),
                    None => Related::One(None),
                }
            };
            shaped.relations.insert(rs.relation.name.to_string(), value);
        }

        if let Some(counts) = &selection.counts {
            let mut out = BTreeMap::new();
            for cs in counts {
                let related = self.resolver.load_related(&cs.relation, record)?;
                let n = match &cs.filter {
                    None => related.len(),
                    Some(filter) => {
                        let mut n = 0;
                        for r in &related {
                            if filter.matches(r, self.resolver)? {
                                n += 1;
                            }
                        }
                        n
                    }
                };
                out.insert(cs.relation.name.to_string(), u64::try_from(n).unwrap_or(u64::MAX));
            }
            shaped.counts = Some(out);
        }
        Ok(shaped)
    }

    pub fn shape_all(
        &self,
        entity: Entity,
        records: &[Record],
        selection: &Selection,
    ) -> Result<Vec<ShapedRecord>, DataError> {
        records
            .iter()
            .map(|r| self.shape(entity, r, selection))
            .collect()
    }
}
