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


//! Shared store construction
//!
//! The store is opened at most once per [`StoreProvider`]: the first caller
//! opens the database, concurrent callers wait for that open and share the
//! result. A provider is created explicitly at startup and handed to whoever
//! needs the store; nothing here is process-global.

use crate::config::StoreConfig;
use crate::error::Result;
use crate::storage::store::BookStore;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Lazily opened, shared [`BookStore`]
#[derive(Debug)]
pub struct StoreProvider {
    config: StoreConfig,
    store: OnceCell<Arc<BookStore>>,
}

impl StoreProvider {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            store: OnceCell::new(),
        }
    }

    /// Get the shared store, opening it on first use
    ///
    /// If opening fails the error is returned and nothing is cached, so a
    /// later call tries again.
    pub async fn get_or_open(&self) -> Result<Arc<BookStore>> {
        let store = self
            .store
            .get_or_try_init(|| async {
                info!(location = ?self.config.location, "opening shared book store");
                BookStore::open(&self.config).await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(store))
    }

    /// The store if it has already been opened
    pub fn get(&self) -> Option<Arc<BookStore>> {
        self.store.get().cloned()
    }

    pub fn is_opened(&self) -> bool {
        self.store.initialized()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
