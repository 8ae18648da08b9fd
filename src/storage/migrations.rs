// LibraryManagement - Personal Book Catalog
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Database schema and version handling
//!
//! The schema version is kept in SQLite's `PRAGMA user_version`. Migration
//! strategy is destructive: when the stored version differs from the one
//! this build expects, `library_table` is dropped and recreated empty. All
//! rows are lost. This is documented product behaviour, reported through a
//! warning in the log rather than an error to callers.

use crate::error::{LibraryError, Result};
use sqlx::{Executor, SqlitePool};
use tracing::{info, warn};

/// Name of the single catalog table
pub const BOOK_TABLE: &str = "library_table";

/// Schema version expected by this build
pub const SCHEMA_VERSION: u32 = 2;

/// What [`run_migrations`] did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// Stored version already matched
    Current,
    /// Fresh database, table created
    Created,
    /// Version mismatch, table dropped and recreated
    Recreated { from: u32, to: u32, discarded_rows: i64 },
}

/// Bring the schema to `version`, wiping the table on mismatch
pub async fn run_migrations(pool: &SqlitePool, version: u32) -> Result<SchemaOutcome> {
    let stored = stored_version(pool).await?;

    if stored == version {
        // Covers a table dropped by hand behind our back
        create_book_table(pool).await?;
        return Ok(SchemaOutcome::Current);
    }

    let existing_rows = count_rows_if_present(pool).await?;

    let mut tx = pool.begin().await?;
    let drop_sql = format!("DROP TABLE IF EXISTS {BOOK_TABLE}");
    // PRAGMA does not accept bound parameters
    let version_sql = format!("PRAGMA user_version = {version}");
    for statement in [drop_sql, create_table_sql(), version_sql] {
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| LibraryError::MigrationFailed(e.to_string()))?;
    }
    tx.commit().await?;

    match (stored, existing_rows) {
        (0, None) => {
            info!(table = BOOK_TABLE, version, "created catalog schema");
            Ok(SchemaOutcome::Created)
        }
        (from, rows) => {
            let discarded_rows = rows.unwrap_or(0);
            warn!(
                table = BOOK_TABLE,
                from,
                to = version,
                discarded_rows,
                "schema version mismatch, catalog table recreated and all rows discarded"
            );
            Ok(SchemaOutcome::Recreated { from, to: version, discarded_rows })
        }
    }
}

/// Read the schema version stored in the database file
pub async fn stored_version(pool: &SqlitePool) -> Result<u32> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version as u32)
}

async fn create_book_table(pool: &SqlitePool) -> Result<()> {
    pool.execute(create_table_sql().as_str())
        .await
        .map_err(|e| LibraryError::MigrationFailed(e.to_string()))?;
    Ok(())
}

async fn count_rows_if_present(pool: &SqlitePool) -> Result<Option<i64>> {
    let present: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(BOOK_TABLE)
            .fetch_optional(pool)
            .await?;

    if present.is_none() {
        return Ok(None);
    }

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {BOOK_TABLE}"))
        .fetch_one(pool)
        .await?;
    Ok(Some(count))
}

fn create_table_sql() -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {BOOK_TABLE} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            coverimage BLOB
        )
        "#
    )
}
