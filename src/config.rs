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


//! Store configuration
//!
//! Everything needed to open the catalog store: where it lives, which schema
//! version the running build expects, and how much concurrency the pool and
//! the background mutation queue allow.
//!
//! # Database Location
//! - Desktop (macOS): ~/Library/Application Support/LibraryManagement/library_database.db
//! - Desktop (Linux): ~/.local/share/LibraryManagement/library_database.db
//! - Desktop (Windows): %APPDATA%/LibraryManagement/library_database.db
//! - Android/iOS: supplied by the host app from its private data directory

use crate::storage::migrations::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the catalog database
pub const DATABASE_NAME: &str = "library_database.db";

/// Application directory name under the platform data directory
const APP_DIR: &str = "LibraryManagement";

/// Where the store keeps its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLocation {
    /// SQLite file on disk (created if missing)
    File(PathBuf),
    /// Private in-memory database, lost when the store is dropped
    InMemory,
}

/// Configuration for opening a [`BookStore`](crate::storage::BookStore)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// Schema version this build expects; a mismatch wipes the table
    pub schema_version: u32,
    pub max_connections: u32,
    #[serde(with = "duration_secs")]
    pub busy_timeout: Duration,
    /// Capacity of the change notification channel
    pub change_buffer: usize,
    /// Upper bound on mutation tasks touching the store at once
    pub max_concurrent_writes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::at(Self::default_path())
    }
}

impl StoreConfig {
    /// Configuration for a database file at `path`
    pub fn at<P: AsRef<Path>>(path: P) -> Self {
        Self {
            location: StoreLocation::File(path.as_ref().to_path_buf()),
            schema_version: SCHEMA_VERSION,
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
            change_buffer: 64,
            max_concurrent_writes: 4,
        }
    }

    /// Configuration for a private in-memory database (tests, previews)
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            max_connections: 1,
            ..Self::at(DATABASE_NAME)
        }
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_change_buffer(mut self, capacity: usize) -> Self {
        self.change_buffer = capacity.max(1);
        self
    }

    pub fn with_max_concurrent_writes(mut self, max: usize) -> Self {
        self.max_concurrent_writes = max.max(1);
        self
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StoreLocation::File(path) => Some(path),
            StoreLocation::InMemory => None,
        }
    }

    /// Get default database path for the platform
    ///
    /// Note: For Android/iOS, the host app should pass its own data directory
    pub fn default_path() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(APP_DIR)
                .join(DATABASE_NAME)
        }

        #[cfg(target_os = "linux")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join(APP_DIR)
                .join(DATABASE_NAME)
        }

        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join(APP_DIR).join(DATABASE_NAME)
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            PathBuf::from(".").join(APP_DIR).join(DATABASE_NAME)
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
