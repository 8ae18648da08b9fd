//! Error types for the library catalog core
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by the layer that raises them (store, live query,
//! background mutation queue, FFI input) so callers can decide what is
//! recoverable.
//!
//! ## What surfaces where
//!
//! - Constraint failures on write → `ConstraintViolation` (the row is left untouched)
//! - Lookup by id with no matching row → `NotFound`
//! - The store file cannot be opened → `StoreUnavailable` (fatal, no retry policy)
//! - Schema version mismatch → never surfaced; the table is recreated and a
//!   warning is logged instead
//! - A live query that can no longer read the table → `LiveQueryFailed`
//! - A background mutation aborted by teardown → `Cancelled`

use thiserror::Error;

/// Result type alias using our LibraryError type
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Main error type for the catalog core
#[derive(Error, Debug)]
pub enum LibraryError {
    // ===== Store Errors =====

    /// A write would violate a table constraint (e.g. reusing an existing id)
    #[error("Constraint violation on {table}: {message}")]
    ConstraintViolation {
        table: String,
        /// Message reported by the database engine
        message: String,
    },

    /// No book with the requested id
    #[error("Book not found: id {id}")]
    NotFound { id: i64 },

    /// The backing store could not be opened or created
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Schema creation or destructive recreation failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    // ===== Reactive / Task Errors =====

    /// The live query could no longer read the table
    #[error("Live query failed: {0}")]
    LiveQueryFailed(String),

    /// Operation was cancelled by teardown of its owner
    #[error("Operation cancelled")]
    Cancelled,

    // ===== Input / General Errors =====

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External Library Errors =====

    /// Database driver error from sqlx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LibraryError {
    /// Create a NotFound error for a book id
    pub fn not_found(id: i64) -> Self {
        LibraryError::NotFound { id }
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        LibraryError::InvalidInput(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        LibraryError::InternalError(message.into())
    }

    /// Map a sqlx error raised by a write against `table`.
    ///
    /// Constraint failures become `ConstraintViolation`; anything else is
    /// passed through unchanged.
    pub fn from_write(table: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let is_constraint = matches!(
                db_err.kind(),
                sqlx::error::ErrorKind::UniqueViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::CheckViolation
                    | sqlx::error::ErrorKind::ForeignKeyViolation
            );
            if is_constraint {
                return LibraryError::ConstraintViolation {
                    table: table.to_string(),
                    message: db_err.message().to_string(),
                };
            }
        }
        LibraryError::SqlxError(err)
    }

    /// Check if error is a rejected write
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, LibraryError::ConstraintViolation { .. })
    }

    /// Check if error is a missing record
    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound { .. })
    }

    /// Check if the application cannot continue without its store
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LibraryError::StoreUnavailable(_) | LibraryError::MigrationFailed(_)
        )
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            LibraryError::ConstraintViolation { .. } => {
                "This book could not be saved because it conflicts with an existing entry.".to_string()
            }
            LibraryError::NotFound { .. } => {
                "This book no longer exists in your library.".to_string()
            }
            LibraryError::StoreUnavailable(_) | LibraryError::MigrationFailed(_) => {
                "Your library could not be opened. Please restart the app.".to_string()
            }
            LibraryError::Cancelled => "The operation was cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = LibraryError::ConstraintViolation {
            table: "library_table".to_string(),
            message: "UNIQUE constraint failed: library_table.id".to_string(),
        };
        assert!(err.is_constraint_violation());
        assert!(!err.is_not_found());
        assert!(!err.is_fatal());

        assert!(LibraryError::not_found(7).is_not_found());
        assert!(LibraryError::StoreUnavailable("disk full".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(LibraryError::not_found(42).to_string(), "Book not found: id 42");
        assert_eq!(
            LibraryError::invalid_input("missing title").to_string(),
            "Invalid input: missing title"
        );
    }

    #[test]
    fn test_user_message_hides_engine_detail() {
        let err = LibraryError::ConstraintViolation {
            table: "library_table".to_string(),
            message: "UNIQUE constraint failed".to_string(),
        };
        assert!(!err.user_message().contains("UNIQUE"));
    }
}
