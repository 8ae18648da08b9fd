//! UI-facing repository
//!
//! Wraps the storage layer in a fire-and-forget mutation API and a
//! continuously updated list for UI binding.

pub mod library;
pub mod queue;

pub use library::LibraryRepository;
pub use queue::{MutationHandle, MutationKind, WorkQueue};
