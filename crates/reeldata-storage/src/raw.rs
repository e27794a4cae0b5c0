// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw SQL passthrough. Statements are executed as given; parameters are JSON
//! scalars bound positionally.

use reeldata_core::DataError;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::codec::{json_to_sql, raw_to_json};

/// A result row keyed by column name.
pub type RawRow = Map<String, JsonValue>;

/// Executes a statement and returns the number of rows it changed.
pub fn execute_raw(conn: &Connection, sql: &str, params: &[JsonValue]) -> Result<usize, DataError> {
    debug!(%sql, params = params.len(), "execute_raw");
    conn.execute(sql, params_from_iter(params.iter().map(json_to_sql)))
        .map_err(DataError::storage)
}

/// Runs a query and returns every row.
pub fn query_raw(conn: &Connection, sql: &str, params: &[JsonValue]) -> Result<Vec<RawRow>, DataError> {
    debug!(%sql, params = params.len(), "query_raw");
    let mut stmt = conn.prepare(sql).map_err(DataError::storage)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt
        .query(params_from_iter(params.iter().map(json_to_sql)))
        .map_err(DataError::storage)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(DataError::storage)? {
        let mut obj = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            let cell = row.get_ref(i).map_err(DataError::storage)?;
            obj.insert(name.clone(), raw_to_json(cell));
        }
        out.push(obj);
    }
    Ok(out)
}
