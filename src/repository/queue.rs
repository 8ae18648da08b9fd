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


//! Background mutation queue
//!
//! Writes never run on the caller's (UI) thread. Each submitted mutation is
//! spawned onto the tokio runtime, gated by a semaphore so only a bounded
//! number touch the store at once, and tracked so the owner can abort all of
//! them on teardown.
//!
//! # Ordering
//! Mutations submitted back-to-back are not guaranteed to complete in
//! submission order. The only serialisation is SQLite's own, one statement
//! at a time.

use crate::error::{LibraryError, Result};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error};

/// Kind of mutation, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MutationKind::Add => "add",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        })
    }
}

/// Handle to a submitted mutation
///
/// Dropping it leaves the mutation running (fire-and-forget). Awaiting
/// [`outcome`](MutationHandle::outcome) reports how it ended.
#[derive(Debug)]
pub struct MutationHandle {
    task_id: u64,
    kind: MutationKind,
    handle: JoinHandle<Result<()>>,
}

impl MutationHandle {
    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the mutation to end
    ///
    /// Returns `Cancelled` if the queue was shut down before it completed.
    pub async fn outcome(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(LibraryError::Cancelled),
            Err(e) => Err(LibraryError::internal(format!("mutation task panicked: {}", e))),
        }
    }
}

/// Bounded, cancellable queue of background mutations
#[derive(Debug)]
pub struct WorkQueue {
    semaphore: Arc<Semaphore>,
    active: Arc<Mutex<HashMap<u64, AbortHandle>>>,
    next_id: AtomicU64,
}

impl WorkQueue {
    /// Create a queue allowing `max_concurrent` mutations at once
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Spawn `mutation` in the background and return immediately
    ///
    /// Must be called from within a tokio runtime. Failures are logged here
    /// and also reported through the returned handle.
    pub fn submit<F>(&self, kind: MutationKind, mutation: F) -> MutationHandle
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let task_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let semaphore = Arc::clone(&self.semaphore);
        let active = Arc::clone(&self.active);

        // Held across spawn so the task cannot deregister before it is registered
        let mut registry = lock(&self.active);

        let handle = tokio::spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => mutation.await,
                // Semaphore closed by shutdown
                Err(_) => Err(LibraryError::Cancelled),
            };

            match &result {
                Ok(()) => debug!(task_id, %kind, "mutation completed"),
                Err(e) => error!(task_id, %kind, error = %e, "background mutation failed"),
            }

            lock(&active).remove(&task_id);
            result
        });

        registry.insert(task_id, handle.abort_handle());
        drop(registry);

        MutationHandle { task_id, kind, handle }
    }

    /// Number of mutations submitted but not yet finished
    pub fn pending(&self) -> usize {
        lock(&self.active).len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Abort every pending mutation and refuse new ones
    ///
    /// Each mutation is a single statement, so there is nothing to roll back:
    /// a mutation either reached the database or it did not.
    pub fn shutdown(&self) {
        self.semaphore.close();
        let aborted: Vec<_> = lock(&self.active).drain().collect();
        if !aborted.is_empty() {
            debug!(count = aborted.len(), "aborting pending mutations");
        }
        for (_, task) in aborted {
            task.abort();
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking mutation cannot leave the map half-updated
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
