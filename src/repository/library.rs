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


//! Observable library repository
//!
//! [`LibraryRepository`] is what the UI talks to. Mutations are handed to a
//! background [`WorkQueue`] and return at once; their only visible effect is
//! the next list published on [`all_books`](LibraryRepository::all_books).
//! The repository keeps no data of its own beyond that mirrored snapshot.
//!
//! ```text
//! UI action -> add/update/delete_book -> WorkQueue task -> BookStore write
//!           -> TableChange -> LiveBooks re-read -> watch channel -> UI
//! ```

use crate::error::{LibraryError, Result};
use crate::repository::queue::{MutationHandle, MutationKind, WorkQueue};
use crate::storage::live::LiveBooks;
use crate::storage::models::Book;
use crate::storage::provider::StoreProvider;
use crate::storage::store::BookStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Async/reactive façade over the shared [`BookStore`]
#[derive(Debug)]
pub struct LibraryRepository {
    store: Arc<BookStore>,
    books: watch::Receiver<Vec<Book>>,
    queue: WorkQueue,
    mirror: JoinHandle<()>,
}

impl LibraryRepository {
    /// Build a repository over `store`
    ///
    /// Reads the current list before returning, so `all_books` starts out
    /// in sync with the table. Must be called from within a tokio runtime.
    pub async fn new(store: Arc<BookStore>, max_concurrent_writes: usize) -> Result<Self> {
        let mut live = store.observe_all();
        let initial = live
            .next()
            .await
            .unwrap_or_else(|| Err(LibraryError::LiveQueryFailed("store closed".to_string())))?;

        info!(books = initial.len(), "library repository ready");

        let (tx, books) = watch::channel(initial);
        let mirror = tokio::spawn(mirror_snapshots(live, tx));

        Ok(Self {
            store,
            books,
            queue: WorkQueue::new(max_concurrent_writes),
            mirror,
        })
    }

    /// Open (or reuse) the provider's store and build a repository over it
    pub async fn from_provider(provider: &StoreProvider) -> Result<Self> {
        let store = provider.get_or_open().await?;
        Self::new(store, provider.config().max_concurrent_writes).await
    }

    /// Schedule an insert
    pub fn add_book(&self, book: Book) -> MutationHandle {
        let store = Arc::clone(&self.store);
        self.queue.submit(MutationKind::Add, async move {
            store.insert(&book).await.map(|_| ())
        })
    }

    /// Schedule an update keyed by `book.id`; an unknown id is a no-op
    pub fn update_book(&self, book: Book) -> MutationHandle {
        let store = Arc::clone(&self.store);
        self.queue.submit(MutationKind::Update, async move {
            store.update(&book).await.map(|_| ())
        })
    }

    /// Schedule a delete keyed by `book.id`; an unknown id is a no-op
    pub fn delete_book(&self, book: Book) -> MutationHandle {
        let store = Arc::clone(&self.store);
        self.queue.submit(MutationKind::Delete, async move {
            store.delete(&book).await.map(|_| ())
        })
    }

    /// Subscribe to the list of all books
    ///
    /// The receiver holds the latest snapshot, already marked as seen;
    /// `changed()` wakes on the next new one and errors once the live query
    /// has ended.
    pub fn all_books(&self) -> watch::Receiver<Vec<Book>> {
        let mut books = self.books.clone();
        books.borrow_and_update();
        books
    }

    /// Current snapshot
    pub fn books(&self) -> Vec<Book> {
        self.books.borrow().clone()
    }

    pub fn store(&self) -> &Arc<BookStore> {
        &self.store
    }

    /// Mutations scheduled but not yet finished
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Whether snapshots are still being mirrored from the store
    pub fn is_live(&self) -> bool {
        !self.mirror.is_finished()
    }

    /// Cancel pending mutations and the live query subscription
    pub fn shutdown(&self) {
        self.queue.shutdown();
        self.mirror.abort();
    }
}

impl Drop for LibraryRepository {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn mirror_snapshots(mut live: LiveBooks, tx: watch::Sender<Vec<Book>>) {
    while let Some(snapshot) = live.next().await {
        match snapshot {
            Ok(books) => {
                debug!(books = books.len(), "publishing catalog snapshot");
                tx.send_replace(books);
            }
            Err(e) => {
                // Ending here closes the channel instead of leaving a stale list
                error!(error = %e, "catalog live query ended");
                return;
            }
        }
    }
    debug!("catalog store closed, live query ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn memory_repository() -> LibraryRepository {
        let provider = StoreProvider::new(StoreConfig::in_memory());
        LibraryRepository::from_provider(&provider)
            .await
            .expect("Failed to build repository")
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let repo = memory_repository().await;
        assert!(repo.books().is_empty());
        assert!(repo.all_books().borrow().is_empty());
        assert!(repo.is_live());
    }

    #[tokio::test]
    async fn test_added_book_becomes_visible() {
        let repo = memory_repository().await;
        let mut books = repo.all_books();

        let _ = repo.add_book(Book::new("Dune", "Herbert"));

        let snapshot = timeout(WAIT, books.wait_for(|b| !b.is_empty()))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Dune");
        assert_eq!(snapshot[0].author, "Herbert");
        assert!(snapshot[0].cover_image.is_none());
        assert_ne!(snapshot[0].id, 0);
    }

    #[tokio::test]
    async fn test_rejected_insert_keeps_stream_alive() {
        let repo = memory_repository().await;
        timeout(WAIT, repo.add_book(Book::new("Dune", "Herbert")).outcome())
            .await
            .unwrap()
            .unwrap();
        let id = repo.store().list_all().await.unwrap()[0].id;

        let err = timeout(WAIT, repo.add_book(Book::new("Clash", "Nobody").with_id(id)).outcome())
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(repo.is_live());

        // The stream still delivers later changes
        let mut books = repo.all_books();
        let _ = repo.add_book(Book::new("Emma", "Austen"));
        timeout(WAIT, books.wait_for(|b| b.len() == 2)).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_an_error() {
        let repo = memory_repository().await;
        let outcome = repo.update_book(Book::new("Ghost", "Nobody").with_id(77)).outcome();
        timeout(WAIT, outcome).await.unwrap().unwrap();
        assert!(repo.books().is_empty());
    }

    #[tokio::test]
    async fn test_delete_twice_is_noop() {
        let repo = memory_repository().await;
        let mut books = repo.all_books();
        let _ = repo.add_book(Book::new("Dune", "Herbert"));
        let book = timeout(WAIT, books.wait_for(|b| b.len() == 1)).await.unwrap().unwrap()[0].clone();

        timeout(WAIT, repo.delete_book(book.clone()).outcome()).await.unwrap().unwrap();
        timeout(WAIT, books.wait_for(|b| b.is_empty())).await.unwrap().unwrap();

        timeout(WAIT, repo.delete_book(book).outcome()).await.unwrap().unwrap();
        assert!(timeout(Duration::from_millis(100), books.changed()).await.is_err());
    }

    #[tokio::test]
    async fn test_new_subscriber_does_not_replay_old_changes() {
        let repo = memory_repository().await;
        let mut first = repo.all_books();
        let _ = repo.add_book(Book::new("Dune", "Herbert"));
        timeout(WAIT, first.wait_for(|b| b.len() == 1)).await.unwrap().unwrap();

        let mut late = repo.all_books();
        assert_eq!(late.borrow().len(), 1);
        assert!(timeout(Duration::from_millis(100), late.changed()).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_stops_mirroring_and_cancels_writes() {
        let repo = memory_repository().await;
        let mut books = repo.all_books();
        repo.shutdown();

        let handle = repo.add_book(Book::new("Too Late", "Nobody"));
        assert!(matches!(timeout(WAIT, handle.outcome()).await.unwrap(), Err(LibraryError::Cancelled)));

        // Sender dropped with the aborted mirror task
        assert!(timeout(WAIT, books.changed()).await.unwrap().is_err());
        assert!(!repo.is_live());
        assert_eq!(repo.store().count().await.unwrap(), 0);
    }
}
