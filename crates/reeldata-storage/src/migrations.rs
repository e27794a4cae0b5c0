// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! SQL files under `migrations/` are compiled into the binary with
//! `embed_migrations!` and applied whenever the database is opened. Applied
//! versions are tracked in `refinery_schema_history`.

use reeldata_core::DataError;
use tracing::info;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Runs all pending migrations against `conn`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), DataError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(DataError::storage)?;
    for migration in report.applied_migrations() {
        info!(version = migration.version(), name = migration.name(), "migration applied");
    }
    Ok(())
}
