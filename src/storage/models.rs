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


//! Catalog data model
//!
//! A single entity, [`Book`], mapped 1:1 onto `library_table`.
//!
//! # Identity
//! `id` is assigned by the store on insert. A book built in memory carries
//! `id == 0` until it has been inserted; update and delete are keyed by it.
//!
//! # Equality
//! Two books are equal only when all four fields match, with the cover
//! compared byte for byte. Two missing covers are equal; a missing and a
//! present cover never are.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Id carried by a book that has not been inserted yet
pub const UNSAVED_ID: i64 = 0;

/// A catalogued book
#[derive(Debug, Clone, PartialEq, Eq, Hash, FromRow, Serialize, Deserialize)]
pub struct Book {
    /// Row id (auto-increment), `0` before first insert
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Encoded image bytes (PNG from the image picker), opaque to the store
    #[sqlx(rename = "coverimage")]
    #[serde(default, with = "cover_base64")]
    pub cover_image: Option<Vec<u8>>,
}

impl Book {
    /// Create an unsaved book
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: UNSAVED_ID,
            title: title.into(),
            author: author.into(),
            cover_image: None,
        }
    }

    /// Attach cover image bytes
    pub fn with_cover(mut self, cover: Vec<u8>) -> Self {
        self.cover_image = Some(cover);
        self
    }

    /// Copy of this book carrying the given id
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Whether the store has assigned an id
    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED_ID
    }

    pub fn has_cover(&self) -> bool {
        self.cover_image.is_some()
    }
}

/// Covers cross JSON boundaries as standard base64
mod cover_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_book_is_unsaved() {
        let book = Book::new("Dune", "Herbert");
        assert_eq!(book.id, UNSAVED_ID);
        assert!(!book.is_persisted());
        assert!(!book.has_cover());
        assert!(book.with_id(3).is_persisted());
    }

    #[test]
    fn test_equality_compares_cover_bytes() {
        let a = Book::new("Dune", "Herbert").with_id(1).with_cover(vec![0x89, 0x50, 0x4e, 0x47]);
        let b = a.clone();
        assert_eq!(a, b);

        let mut c = a.clone();
        if let Some(cover) = c.cover_image.as_mut() {
            cover[3] = 0x48;
        }
        assert_ne!(a, c);
    }

    #[test]
    fn test_equality_missing_covers() {
        let a = Book::new("Dune", "Herbert").with_id(1);
        let b = Book::new("Dune", "Herbert").with_id(1);
        assert_eq!(a, b);

        let c = b.clone().with_cover(Vec::new());
        assert_ne!(a, c, "missing cover must differ from an empty cover");
    }

    #[test]
    fn test_equality_requires_all_fields() {
        let base = Book::new("Dune", "Herbert").with_id(1);
        assert_ne!(base, base.clone().with_id(2));
        assert_ne!(base, Book::new("Dune Messiah", "Herbert").with_id(1));
        assert_ne!(base, Book::new("Dune", "Frank Herbert").with_id(1));
    }

    #[test]
    fn test_json_cover_is_base64() {
        let book = Book::new("Dune", "Herbert").with_id(5).with_cover(vec![1, 2, 3]);
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["cover_image"], "AQID");

        let parsed: Book = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, book);
    }

    #[test]
    fn test_json_defaults_unsaved_without_cover() {
        let parsed: Book = serde_json::from_str(r#"{"title":"Emma","author":"Austen"}"#).unwrap();
        assert_eq!(parsed, Book::new("Emma", "Austen"));
    }
}
