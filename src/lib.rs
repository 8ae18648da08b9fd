//! Personal library catalog core
//!
//! Persistence and reactive state for a book catalog app: a single local
//! SQLite table of books, a live query that republishes the full list after
//! every change, and a fire-and-forget repository the UI binds to.
//!
//! - [`storage`]: [`BookStore`](storage::BookStore) CRUD, live query, lazy shared store
//! - [`repository`]: [`LibraryRepository`](repository::LibraryRepository) for the UI
//! - [`bridge`]: C ABI surface for native shells

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod repository;
pub mod storage;

pub use config::{StoreConfig, StoreLocation};
pub use error::{LibraryError, Result};
pub use repository::{LibraryRepository, MutationHandle};
pub use storage::{Book, BookStore, LiveBooks, StoreProvider};
