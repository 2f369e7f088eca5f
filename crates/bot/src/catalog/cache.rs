//! Process-wide category code to name cache.
//!
//! Validating a category code never costs a remote call. The cache is only
//! rebuilt as a whole, at start-up and when an operator asks for it, so a
//! category added or renamed in between stays invisible until then.

use std::collections::HashMap;
use std::sync::Arc;

use shelf_core::CategoryCode;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::db::{CatalogStore, RepositoryError, categories};

/// Shared code → display name mapping.
#[derive(Debug, Clone, Default)]
pub struct CategoryCache {
    entries: Arc<RwLock<HashMap<CategoryCode, String>>>,
}

impl CategoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entry from one bulk read of the category table.
    ///
    /// On failure the previous entries are kept.
    ///
    /// # Errors
    ///
    /// Returns the store error of the bulk read.
    #[instrument(skip_all)]
    pub async fn refresh(&self, store: &dyn CatalogStore) -> Result<usize, RepositoryError> {
        let categories = categories::list(store).await?;
        let count = self
            .replace(categories.into_iter().map(|c| (c.code, c.name)))
            .await;
        debug!(count, "Category cache refreshed");
        Ok(count)
    }

    /// Replace every entry.
    pub async fn replace(&self, entries: impl IntoIterator<Item = (CategoryCode, String)>) -> usize {
        let entries: HashMap<_, _> = entries.into_iter().collect();
        let count = entries.len();
        *self.entries.write().await = entries;
        count
    }

    /// Display name of a category code.
    pub async fn lookup(&self, code: &CategoryCode) -> Option<String> {
        self.entries.read().await.get(code).cloned()
    }

    /// True if the code is known.
    pub async fn is_valid(&self, code: &CategoryCode) -> bool {
        self.entries.read().await.contains_key(code)
    }
}
