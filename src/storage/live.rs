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


//! Live query over the catalog table
//!
//! [`LiveBooks`] re-delivers the full book list whenever the table changes.
//! It suspends only while waiting for the next change notification and
//! re-reads the table once per notification. A subscriber that falls more
//! than the channel capacity behind skips the missed notifications and
//! re-reads once, so it still converges on the latest state.

use crate::error::{LibraryError, Result};
use crate::storage::models::Book;
use crate::storage::queries;
use crate::storage::store::TableChange;
use futures_util::Stream;
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveState {
    /// Nothing delivered yet
    Initial,
    Running,
    /// Store closed or table unreadable
    Finished,
}

/// Subscription handle returned by [`BookStore::observe_all`](crate::storage::BookStore::observe_all)
///
/// Dropping the handle cancels the subscription.
#[derive(Debug)]
pub struct LiveBooks {
    pool: SqlitePool,
    changes: broadcast::Receiver<TableChange>,
    state: LiveState,
}

impl LiveBooks {
    pub(crate) fn new(pool: SqlitePool, changes: broadcast::Receiver<TableChange>) -> Self {
        Self {
            pool,
            changes,
            state: LiveState::Initial,
        }
    }

    /// Next full snapshot of the table
    ///
    /// Returns `None` once the store has gone away. A failed read is yielded
    /// as `Err(LiveQueryFailed)` once, after which the subscription ends.
    pub async fn next(&mut self) -> Option<Result<Vec<Book>>> {
        match self.state {
            LiveState::Finished => return None,
            LiveState::Initial => self.state = LiveState::Running,
            LiveState::Running => match self.changes.recv().await {
                Ok(change) => debug!(?change, "live query re-evaluating"),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live query lagged, re-evaluating once")
                }
                Err(RecvError::Closed) => {
                    self.state = LiveState::Finished;
                    return None;
                }
            },
        }

        match queries::list_books(&self.pool).await {
            Ok(books) => Some(Ok(books)),
            Err(e) => {
                error!(error = %e, "live query could not read the catalog table");
                self.state = LiveState::Finished;
                Some(Err(LibraryError::LiveQueryFailed(e.to_string())))
            }
        }
    }

    /// Whether the subscription has ended
    pub fn is_finished(&self) -> bool {
        self.state == LiveState::Finished
    }

    /// Adapt into a `Stream` of snapshots
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Book>>> + Send + 'static {
        futures_util::stream::unfold(self, |mut live| async move {
            live.next().await.map(|snapshot| (snapshot, live))
        })
    }
}
