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


//! Catalog storage
//!
//! This module owns the on-device persistence of the library: a single
//! SQLite table of books accessed through sqlx, plus the live query that
//! pushes a fresh list to subscribers after every change.
//!
//! # Database Schema
//! - `library_table`: `id` (auto-increment primary key), `title`, `author`,
//!   `coverimage` (nullable BLOB)
//! - Schema version in `PRAGMA user_version`; a mismatch recreates the table
//!
//! # Usage Example
//! ```no_run
//! use library_core::config::StoreConfig;
//! use library_core::storage::{Book, StoreProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = StoreProvider::new(StoreConfig::at("./library.db"));
//! let store = provider.get_or_open().await?;
//!
//! let id = store.insert(&Book::new("Dune", "Frank Herbert")).await?;
//! let book = store.get_by_id(id).await?;
//!
//! let mut live = store.observe_all();
//! while let Some(snapshot) = live.next().await {
//!     println!("{} books", snapshot?.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod live;
pub mod migrations;
pub mod models;
pub mod provider;
pub mod queries;
pub mod store;

// Re-export commonly used types
pub use database::{Database, DatabaseStats};
pub use live::LiveBooks;
pub use migrations::{SchemaOutcome, BOOK_TABLE, SCHEMA_VERSION};
pub use models::Book;
pub use provider::StoreProvider;
pub use store::{BookStore, TableChange};
