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


//! C FFI bridge - exposes the library repository to the native UI shell
//!
//! # Architecture
//! UI (Swift/Kotlin) → C FFI → [`LibraryRepository`] → [`BookStore`](crate::storage::BookStore)
//!
//! # Design Patterns
//! 1. **JSON Communication**: books cross the boundary as JSON, covers base64-encoded
//! 2. **Error Handling**: all errors are returned as JSON error responses
//! 3. **Async Runtime**: a process-wide tokio runtime runs the store and the
//!    background mutation queue
//! 4. **No Panics**: panics are caught so they never unwind across the boundary
//! 5. **Memory Safety**: returned strings must be freed with `rust_free_string()`
//!
//! # Response Format
//! ```json
//! { "success": true, "data": { ... } }
//! ```
//! Or on error:
//! ```json
//! { "success": false, "error": "Error message" }
//! ```
//!
//! # Subscription
//! The shell keeps one thread blocked in `rust_library_wait_for_change()`
//! and re-renders with the list it returns.

use crate::config::StoreConfig;
use crate::error::{LibraryError, Result};
use crate::repository::LibraryRepository;
use crate::storage::models::Book;
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

lazy_static::lazy_static! {
    static ref RUNTIME: tokio::runtime::Runtime =
        tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    static ref LIBRARY: Mutex<Option<LibraryRepository>> = Mutex::new(None);

    /// Book list receiver shared by `rust_library_wait_for_change` calls, so
    /// each call only wakes for snapshots the previous one has not returned
    static ref WATCHER: Mutex<Option<watch::Receiver<Vec<Book>>>> = Mutex::new(None);
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Safely convert C string pointer to Rust String
fn c_str_to_string(ptr: *const c_char) -> Result<String> {
    if ptr.is_null() {
        return Err(LibraryError::invalid_input("Null pointer received"));
    }
    // SAFETY: caller guarantees a valid null-terminated C string
    let c_str = unsafe { CStr::from_ptr(ptr) };
    c_str
        .to_str()
        .map(|s| s.to_string())
        .map_err(|e| LibraryError::invalid_input(format!("Invalid UTF-8: {}", e)))
}

/// Convert Rust string to C string pointer
///
/// Caller MUST free the returned pointer using `rust_free_string()`
fn string_to_c_str(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => {
            let fallback = CString::new(error_response("String contains null bytes")).unwrap_or_default();
            fallback.into_raw()
        }
    }
}

fn success_response<T: Serialize>(data: T) -> String {
    serde_json::json!({
        "success": true,
        "data": data
    })
    .to_string()
}

fn error_response(error: &str) -> String {
    serde_json::json!({
        "success": false,
        "error": error
    })
    .to_string()
}

/// Wrap a function call with panic catching
fn catch_panic<F>(f: F) -> String
where
    F: FnOnce() -> Result<String> + panic::UnwindSafe,
{
    match panic::catch_unwind(f) {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => error_response(&e.to_string()),
        Err(panic_err) => {
            let panic_msg = if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic occurred".to_string()
            };
            error_response(&format!("Rust panic: {}", panic_msg))
        }
    }
}

fn library() -> MutexGuard<'static, Option<LibraryRepository>> {
    LIBRARY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn watcher() -> MutexGuard<'static, Option<watch::Receiver<Vec<Book>>>> {
    WATCHER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run `f` against the open repository
fn with_library<T>(f: impl FnOnce(&LibraryRepository) -> Result<T>) -> Result<T> {
    let guard = library();
    let repo = guard
        .as_ref()
        .ok_or_else(|| LibraryError::invalid_input("Library is not open; call rust_library_open first"))?;
    f(repo)
}

fn parse_book(book_json: *const c_char) -> Result<Book> {
    let json = c_str_to_string(book_json)?;
    Ok(serde_json::from_str(&json)?)
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Open the library database at `db_path` (created if missing)
///
/// Calling it again while open is a no-op.
///
/// # Returns
/// `{"success": true, "data": {"opened": true, "books": 3}}`
#[no_mangle]
pub extern "C" fn rust_library_open(db_path: *const c_char) -> *mut c_char {
    let response = catch_panic(|| {
        let db_path = c_str_to_string(db_path)?;

        let mut guard = library();
        if let Some(repo) = guard.as_ref() {
            return Ok(success_response(serde_json::json!({
                "opened": false,
                "books": repo.books().len(),
            })));
        }

        let config = StoreConfig::at(&db_path);
        let repo = RUNTIME.block_on(async {
            let provider = crate::storage::StoreProvider::new(config);
            LibraryRepository::from_provider(&provider).await
        })?;
        let count = repo.books().len();
        *watcher() = Some(repo.all_books());
        *guard = Some(repo);

        Ok(success_response(serde_json::json!({
            "opened": true,
            "books": count,
        })))
    });

    string_to_c_str(response)
}

/// Cancel pending writes and the live subscription, then close the library
#[no_mangle]
pub extern "C" fn rust_library_shutdown() -> *mut c_char {
    let response = catch_panic(|| {
        let repo = {
            let mut guard = library();
            watcher().take();
            guard.take()
        };
        let closed = repo.is_some();
        if let Some(repo) = repo {
            repo.shutdown();
            let store = std::sync::Arc::clone(repo.store());
            drop(repo);
            RUNTIME.block_on(store.database().close());
        }
        Ok(success_response(serde_json::json!({ "closed": closed })))
    });

    string_to_c_str(response)
}

// ============================================================================
// MUTATIONS (fire-and-forget)
// ============================================================================

fn schedule(
    book_json: *const c_char,
    submit: impl FnOnce(&LibraryRepository, Book) -> crate::repository::MutationHandle,
) -> String {
    catch_panic(panic::AssertUnwindSafe(|| {
        let book = parse_book(book_json)?;
        let handle = with_library(|repo| {
            let _runtime = RUNTIME.enter();
            Ok(submit(repo, book))
        })?;
        Ok(success_response(serde_json::json!({
            "scheduled": true,
            "task_id": handle.task_id(),
            "kind": handle.kind().to_string(),
        })))
    }))
}

/// Schedule an insert of the book in `book_json` (`id` omitted or 0)
#[no_mangle]
pub extern "C" fn rust_library_add_book(book_json: *const c_char) -> *mut c_char {
    string_to_c_str(schedule(book_json, |repo, book| repo.add_book(book)))
}

/// Schedule an update of the book in `book_json`, keyed by its `id`
#[no_mangle]
pub extern "C" fn rust_library_update_book(book_json: *const c_char) -> *mut c_char {
    string_to_c_str(schedule(book_json, |repo, book| repo.update_book(book)))
}

/// Schedule a delete of the book in `book_json`, keyed by its `id`
#[no_mangle]
pub extern "C" fn rust_library_delete_book(book_json: *const c_char) -> *mut c_char {
    string_to_c_str(schedule(book_json, |repo, book| repo.delete_book(book)))
}

// ============================================================================
// READS
// ============================================================================

/// Fetch one book by id; error response if it does not exist
#[no_mangle]
pub extern "C" fn rust_library_get_book(id: i64) -> *mut c_char {
    let response = catch_panic(|| {
        let store = with_library(|repo| Ok(std::sync::Arc::clone(repo.store())))?;
        let book = RUNTIME.block_on(store.get_by_id(id))?;
        Ok(success_response(book))
    });

    string_to_c_str(response)
}

/// Current list of all books
#[no_mangle]
pub extern "C" fn rust_library_all_books() -> *mut c_char {
    let response = catch_panic(|| {
        let books = with_library(|repo| Ok(repo.books()))?;
        Ok(success_response(books))
    });

    string_to_c_str(response)
}

/// Block until the book list changes or `timeout_ms` elapses
///
/// # Returns
/// `{"success": true, "data": {"changed": true, "books": [...]}}`
/// An error response means the live query has ended.
#[no_mangle]
pub extern "C" fn rust_library_wait_for_change(timeout_ms: u64) -> *mut c_char {
    let response = catch_panic(|| {
        // Take the receiver out so neither lock is held while waiting
        let taken = watcher().take();
        let mut books = match taken {
            Some(books) => books,
            None => with_library(|repo| Ok(repo.all_books()))?,
        };

        let changed = RUNTIME.block_on(async {
            match tokio::time::timeout(Duration::from_millis(timeout_ms), books.changed()).await {
                Ok(Ok(())) => Ok(true),
                Ok(Err(_)) => Err(LibraryError::LiveQueryFailed("book list is no longer updated".to_string())),
                Err(_) => Ok(false),
            }
        })?;

        let snapshot = books.borrow_and_update().clone();

        // Hand it back unless the library was shut down meanwhile
        let guard = library();
        if guard.is_some() {
            let mut slot = watcher();
            if slot.is_none() {
                *slot = Some(books);
            }
        }
        drop(guard);

        Ok(success_response(serde_json::json!({
            "changed": changed,
            "books": snapshot,
        })))
    });

    string_to_c_str(response)
}

/// Free a string returned by any `rust_library_*` function
///
/// Must be called exactly once per returned pointer.
#[no_mangle]
pub extern "C" fn rust_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: ptr came from CString::into_raw in this module
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn call(ptr: *mut c_char) -> serde_json::Value {
        assert!(!ptr.is_null());
        let json = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        rust_free_string(ptr);
        serde_json::from_str(&json).unwrap()
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_null_pointer_is_error_response() {
        let response = call(rust_library_open(std::ptr::null()));
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("Null pointer"));
    }

    #[test]
    fn test_catch_panic_reports_panic() {
        let response = catch_panic(|| panic!("boom"));
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("boom"));
    }

    // Single test drives the global library so parallel tests cannot interfere
    #[test]
    fn test_library_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = c(dir.path().join("bridge.db").to_str().unwrap());

        let opened = call(rust_library_open(path.as_ptr()));
        assert_eq!(opened["success"], true, "{opened}");
        assert_eq!(opened["data"]["books"], 0);

        let again = call(rust_library_open(path.as_ptr()));
        assert_eq!(again["data"]["opened"], false);

        let book = c(r#"{"title":"Dune","author":"Herbert","cover_image":"AQID"}"#);
        let scheduled = call(rust_library_add_book(book.as_ptr()));
        assert_eq!(scheduled["data"]["scheduled"], true);
        assert_eq!(scheduled["data"]["kind"], "add");

        let mut books = serde_json::Value::Null;
        for _ in 0..50 {
            let waited = call(rust_library_wait_for_change(100));
            assert_eq!(waited["success"], true);
            books = waited["data"]["books"].clone();
            if books.as_array().map_or(false, |b| !b.is_empty()) {
                break;
            }
        }
        assert_eq!(books[0]["title"], "Dune");
        assert_eq!(books[0]["cover_image"], "AQID");
        let id = books[0]["id"].as_i64().unwrap();
        assert!(id > 0);

        // Nothing changed since the add was returned: wait runs to its timeout
        let started = std::time::Instant::now();
        let idle = call(rust_library_wait_for_change(500));
        assert_eq!(idle["success"], true);
        assert_eq!(idle["data"]["changed"], false);
        assert_eq!(idle["data"]["books"].as_array().unwrap().len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(400));

        let fetched = call(rust_library_get_book(id));
        assert_eq!(fetched["data"]["author"], "Herbert");

        let missing = call(rust_library_get_book(id + 1000));
        assert_eq!(missing["success"], false);

        let bad = c("{not json");
        assert_eq!(call(rust_library_update_book(bad.as_ptr()))["success"], false);

        let all = call(rust_library_all_books());
        assert_eq!(all["data"].as_array().unwrap().len(), 1);

        let closed = call(rust_library_shutdown());
        assert_eq!(closed["data"]["closed"], true);
        assert_eq!(call(rust_library_all_books())["success"], false);
    }
}
