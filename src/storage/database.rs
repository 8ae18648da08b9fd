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


//! Database connection and management
//!
//! This module handles connection pooling, initialization and maintenance
//! of the catalog's SQLite file.
//!
//! # SQLite Configuration
//! - WAL mode so live query reads are not blocked by background writes
//! - Normal synchronous mode (balance safety/speed)
//! - Busy timeout so concurrent writers queue inside SQLite instead of failing

use crate::config::{StoreConfig, StoreLocation};
use crate::error::{LibraryError, Result};
use crate::storage::migrations::{self, SchemaOutcome};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous},
    ConnectOptions,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Database manager - owns the connection pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>, // None for in-memory databases
    schema: SchemaOutcome,
}

impl Database {
    /// Open (or create) the database described by `config` and bring its
    /// schema to `config.schema_version`
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the parent directory or the file cannot
    /// be created or opened, `MigrationFailed` if the schema cannot be set up.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let (pool, path) = match &config.location {
            StoreLocation::File(path) => (Self::connect_file(path, config).await?, Some(path.clone())),
            StoreLocation::InMemory => (Self::connect_memory().await?, None),
        };

        let schema = migrations::run_migrations(&pool, config.schema_version).await?;

        info!(
            path = %path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".to_string()),
            schema_version = config.schema_version,
            ?schema,
            "catalog database opened"
        );

        Ok(Self { pool, path, schema })
    }

    /// Create in-memory database for testing
    pub async fn new_in_memory() -> Result<Self> {
        Self::open(&StoreConfig::in_memory()).await
    }

    async fn connect_file(path: &Path, config: &StoreConfig) -> Result<SqlitePool> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    LibraryError::StoreUnavailable(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .disable_statement_logging();

        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(connect_opts)
            .await
            .map_err(|e| {
                LibraryError::StoreUnavailable(format!(
                    "Failed to open database {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    async fn connect_memory() -> Result<SqlitePool> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?
            .synchronous(SqliteSynchronous::Normal)
            .disable_statement_logging();

        // Every connection to :memory: is its own database, so keep exactly
        // one alive for the lifetime of the pool
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await
            .map_err(|e| LibraryError::StoreUnavailable(format!("Failed to open in-memory database: {}", e)))
    }

    /// Get reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    ///
    /// Returns `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// What happened to the schema when this database was opened
    pub fn schema_outcome(&self) -> SchemaOutcome {
        self.schema
    }

    /// Close database and release all connections
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Runs SQLite integrity check and returns true if database is okay
    pub async fn check_integrity(&self) -> Result<bool> {
        let result: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(&self.pool)
            .await?;

        Ok(result == "ok")
    }

    /// Get database statistics
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;

        let freelist_count: i64 = sqlx::query_scalar("PRAGMA freelist_count")
            .fetch_one(&self.pool)
            .await?;

        Ok(DatabaseStats {
            page_count: page_count as u64,
            page_size: page_size as u64,
            freelist_count: freelist_count as u64,
            total_size: (page_count * page_size) as u64,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Total number of pages in database
    pub page_count: u64,
    /// Size of each page in bytes
    pub page_size: u64,
    /// Number of free pages (unused space)
    pub freelist_count: u64,
    /// Total size of database (page_count * page_size)
    pub total_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new_in_memory().await.expect("Failed to create in-memory database");

        let result: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(db.pool())
            .await
            .expect("Failed to query database");

        assert_eq!(result, 1);
        assert!(db.path().is_none());
        assert_eq!(db.schema_outcome(), SchemaOutcome::Created);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("library.db");

        let db = Database::open(&StoreConfig::at(&path)).await.expect("Failed to open database");
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
        db.close().await;
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn test_integrity_and_stats() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        assert!(db.check_integrity().await.expect("Failed to check integrity"));

        let stats = db.stats().await.expect("Failed to get stats");
        assert!(stats.page_size > 0);
        assert!(stats.page_count > 0);
    }

    #[tokio::test]
    async fn test_directory_path_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file
        let result = Database::open(&StoreConfig::at(dir.path())).await;
        assert!(result.is_err());
    }
}
