// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relation loading used by relation filters and the result shaper.

use crate::error::DataError;
use crate::record::Record;
use crate::schema::RelationDef;

/// Loads the records on the far side of a relation.
pub trait RelationResolver {
    /// Returns the records of `relation.target` related to `record`, in the
    /// store's natural order. A to-one relation yields at most one record.
    fn load_related(&self, relation: &RelationDef, record: &Record) -> Result<Vec<Record>, DataError>;
}
