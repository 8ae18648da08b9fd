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


//! Book store
//!
//! [`BookStore`] owns the catalog table. Every mutation that changes a row
//! publishes exactly one [`TableChange`] on a broadcast channel, which is what
//! drives [`LiveBooks`] subscriptions. Mutations that match no row (update or
//! delete of an unknown id) publish nothing.

use crate::config::StoreConfig;
use crate::error::{LibraryError, Result};
use crate::storage::database::Database;
use crate::storage::live::LiveBooks;
use crate::storage::models::Book;
use crate::storage::queries;
use tokio::sync::broadcast;
use tracing::debug;

/// A row-level change to the catalog table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChange {
    Inserted(i64),
    Updated(i64),
    Deleted(i64),
}

impl TableChange {
    /// Id of the row that changed
    pub fn id(&self) -> i64 {
        match *self {
            TableChange::Inserted(id) | TableChange::Updated(id) | TableChange::Deleted(id) => id,
        }
    }
}

/// Durable CRUD over the catalog plus change notifications
#[derive(Debug)]
pub struct BookStore {
    db: Database,
    changes: broadcast::Sender<TableChange>,
}

impl BookStore {
    /// Open the store described by `config`
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let db = Database::open(config).await?;
        Ok(Self::from_database(db, config.change_buffer))
    }

    /// Wrap an already opened database
    pub fn from_database(db: Database, change_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(change_buffer.max(1));
        Self { db, changes }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert a new book, returns the assigned id
    ///
    /// Fails with `ConstraintViolation` (no upsert) if the book carries an id
    /// that is already taken.
    pub async fn insert(&self, book: &Book) -> Result<i64> {
        let id = queries::insert_book(self.db.pool(), book).await?;
        debug!(id, title = %book.title, "book inserted");
        self.publish(TableChange::Inserted(id));
        Ok(id)
    }

    /// Replace the row matching `book.id`; returns whether a row matched
    pub async fn update(&self, book: &Book) -> Result<bool> {
        let affected = queries::update_book(self.db.pool(), book).await?;
        if affected == 0 {
            debug!(id = book.id, "update matched no row");
            return Ok(false);
        }
        debug!(id = book.id, "book updated");
        self.publish(TableChange::Updated(book.id));
        Ok(true)
    }

    /// Remove the row matching `book.id`; returns whether a row matched
    pub async fn delete(&self, book: &Book) -> Result<bool> {
        self.delete_by_id(book.id).await
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let affected = queries::delete_book(self.db.pool(), id).await?;
        if affected == 0 {
            debug!(id, "delete matched no row");
            return Ok(false);
        }
        debug!(id, "book deleted");
        self.publish(TableChange::Deleted(id));
        Ok(true)
    }

    /// Fetch a book, `NotFound` if no row has that id
    pub async fn get_by_id(&self, id: i64) -> Result<Book> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| LibraryError::not_found(id))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Book>> {
        queries::find_book_by_id(self.db.pool(), id).await
    }

    /// One-shot read of every book, id ascending
    pub async fn list_all(&self) -> Result<Vec<Book>> {
        queries::list_books(self.db.pool()).await
    }

    pub async fn count(&self) -> Result<i64> {
        queries::count_books(self.db.pool()).await
    }

    /// Live query over the whole table
    ///
    /// The first `next()` yields the current list; every later one waits for
    /// a change and yields a fresh full snapshot.
    pub fn observe_all(&self) -> LiveBooks {
        // Subscribe before the first read so nothing slips between them
        LiveBooks::new(self.db.pool().clone(), self.changes.subscribe())
    }

    /// Raw change notifications
    pub fn subscribe_changes(&self) -> broadcast::Receiver<TableChange> {
        self.changes.subscribe()
    }

    pub(crate) fn publish(&self, change: TableChange) {
        // No receivers is fine; nobody is watching
        let _ = self.changes.send(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> BookStore {
        BookStore::open(&StoreConfig::in_memory()).await.expect("Failed to open store")
    }

    #[tokio::test]
    async fn test_round_trip_through_store() {
        let store = memory_store().await;
        let book = Book::new("Dune", "Herbert").with_cover(vec![9, 8, 7]);

        let id = store.insert(&book).await.unwrap();
        assert_ne!(id, 0);
        assert_eq!(store.get_by_id(id).await.unwrap(), book.with_id(id));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = memory_store().await;
        let err = store.get_by_id(41).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.find_by_id(41).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_changes_published_once_per_effective_mutation() {
        let store = memory_store().await;
        let mut changes = store.subscribe_changes();

        let id = store.insert(&Book::new("Dune", "Herbert")).await.unwrap();
        assert!(!store.update(&Book::new("Ghost", "Nobody").with_id(id + 100)).await.unwrap());
        assert!(store.update(&Book::new("Dune", "F. Herbert").with_id(id)).await.unwrap());
        assert!(store.delete_by_id(id).await.unwrap());
        assert!(!store.delete_by_id(id).await.unwrap());

        assert_eq!(changes.recv().await.unwrap(), TableChange::Inserted(id));
        assert_eq!(changes.recv().await.unwrap(), TableChange::Updated(id));
        let deleted = changes.recv().await.unwrap();
        assert_eq!(deleted, TableChange::Deleted(id));
        assert_eq!(deleted.id(), id);
        assert!(matches!(changes.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_rejected_insert_publishes_nothing() {
        let store = memory_store().await;
        let id = store.insert(&Book::new("Dune", "Herbert")).await.unwrap();
        let mut changes = store.subscribe_changes();

        let err = store.insert(&Book::new("Copy", "Cat").with_id(id)).await.unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(changes.try_recv().is_err());
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
