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


//! Book queries
//!
//! Free functions over a `SqlitePool`, one statement each. Callers that need
//! change notifications go through [`BookStore`](crate::storage::BookStore)
//! instead of calling these directly.

use crate::error::{LibraryError, Result};
use crate::storage::migrations::BOOK_TABLE;
use crate::storage::models::Book;
use sqlx::SqlitePool;

/// Insert a book, returns the id it was stored under
///
/// An unsaved book (`id == 0`) gets a fresh id. A book carrying an id is
/// inserted under that id; if the id is taken the insert is aborted with
/// `ConstraintViolation` and the existing row is left untouched.
pub async fn insert_book(pool: &SqlitePool, book: &Book) -> Result<i64> {
    let result = if book.is_persisted() {
        sqlx::query(&format!(
            "INSERT INTO {BOOK_TABLE} (id, title, author, coverimage) VALUES (?, ?, ?, ?)"
        ))
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.cover_image)
        .execute(pool)
        .await
    } else {
        sqlx::query(&format!(
            "INSERT INTO {BOOK_TABLE} (title, author, coverimage) VALUES (?, ?, ?)"
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.cover_image)
        .execute(pool)
        .await
    };

    let result = result.map_err(|e| LibraryError::from_write(BOOK_TABLE, e))?;
    Ok(result.last_insert_rowid())
}

/// Replace every field of the row matching `book.id`, returns rows affected
pub async fn update_book(pool: &SqlitePool, book: &Book) -> Result<u64> {
    let result = sqlx::query(&format!(
        "UPDATE {BOOK_TABLE} SET title = ?, author = ?, coverimage = ? WHERE id = ?"
    ))
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.cover_image)
    .bind(book.id)
    .execute(pool)
    .await
    .map_err(|e| LibraryError::from_write(BOOK_TABLE, e))?;

    Ok(result.rows_affected())
}

/// Delete the row matching `id`, returns rows affected
pub async fn delete_book(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query(&format!("DELETE FROM {BOOK_TABLE} WHERE id = ?"))
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| LibraryError::from_write(BOOK_TABLE, e))?;

    Ok(result.rows_affected())
}

/// Find book by id
pub async fn find_book_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(&format!(
        "SELECT id, title, author, coverimage FROM {BOOK_TABLE} WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(book)
}

/// All books in storage order (id ascending)
pub async fn list_books(pool: &SqlitePool) -> Result<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>(&format!(
        "SELECT id, title, author, coverimage FROM {BOOK_TABLE} ORDER BY id ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(books)
}

/// Count all books
pub async fn count_books(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {BOOK_TABLE}"))
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::Database;

    #[tokio::test]
    async fn test_insert_and_find_book() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let book = Book::new("Dune", "Herbert").with_cover(vec![0x89, b'P', b'N', b'G']);
        let id = insert_book(db.pool(), &book).await.expect("Failed to insert book");
        assert!(id > 0);

        let found = find_book_by_id(db.pool(), id)
            .await
            .expect("Failed to find book")
            .expect("Book should exist");
        assert_eq!(found, book.with_id(id));
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let first = insert_book(db.pool(), &Book::new("Emma", "Austen")).await.unwrap();
        let second = insert_book(db.pool(), &Book::new("Persuasion", "Austen")).await.unwrap();
        assert!(second > first);

        let books = list_books(db.pool()).await.unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Emma", "Persuasion"]);
    }

    #[tokio::test]
    async fn test_explicit_id_collision_is_rejected() {
        let db = Database::new_in_memory().await.expect("Failed to create database");

        let id = insert_book(db.pool(), &Book::new("Dune", "Herbert")).await.unwrap();
        let err = insert_book(db.pool(), &Book::new("Impostor", "Nobody").with_id(id))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation(), "unexpected error: {err:?}");

        // Abort, not upsert
        let kept = find_book_by_id(db.pool(), id).await.unwrap().unwrap();
        assert_eq!(kept.title, "Dune");
        assert_eq!(count_books(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_rows_are_noops() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        insert_book(db.pool(), &Book::new("Dune", "Herbert")).await.unwrap();

        let ghost = Book::new("Ghost", "Nobody").with_id(999);
        assert_eq!(update_book(db.pool(), &ghost).await.unwrap(), 0);
        assert_eq!(delete_book(db.pool(), 999).await.unwrap(), 0);
        assert_eq!(count_books(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_cover() {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        let id = insert_book(db.pool(), &Book::new("Dune", "Herbert").with_cover(vec![1, 2, 3]))
            .await
            .unwrap();

        let edited = Book::new("Dune", "Frank Herbert").with_id(id);
        assert_eq!(update_book(db.pool(), &edited).await.unwrap(), 1);

        let found = find_book_by_id(db.pool(), id).await.unwrap().unwrap();
        assert_eq!(found, edited);
        assert!(!found.has_cover());
    }
}
