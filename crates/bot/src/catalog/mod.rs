//! Catalog consistency protocol.
//!
//! Every operation is a chain of independently committed store calls run
//! strictly in order: later steps use what earlier steps read or wrote. On
//! the first failure the remaining steps are skipped and earlier writes stay
//! committed. A failure after at least one write is reported as
//! [`CatalogError::DependentStep`] so the operator knows the catalog needs a
//! manual look (`recount` repairs drifted counters).
//!
//! Derived fields kept in step by hand:
//!
//! - category `prcount`, the number of live products with that code
//! - product `cat_sort`, the position of a product within its category
//! - category `order`, the listing rank
//! - table membership, which is the only deleted/live state a product has

mod baseline;
mod cache;
mod categories;
mod error;
mod products;

use std::sync::Arc;

pub use baseline::{BaselineError, BaselineOrder, STANDARD_BASELINE};
pub use cache::CategoryCache;
pub use categories::{CounterCorrection, OrderReset};
pub use error::{CatalogError, Entity, Step};
pub use products::{CategoryChange, ProductView};

use crate::db::CatalogStore;
use crate::media::MediaUploader;

struct CatalogInner {
    store: Arc<dyn CatalogStore>,
    media: Arc<dyn MediaUploader>,
    cache: CategoryCache,
    baseline: BaselineOrder,
    folder: String,
}

/// Catalog operations over a store and a media uploader.
///
/// Cheap to clone; clones share the category cache.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("store", &self.inner.store.backend_tag())
            .field("baseline", &self.inner.baseline)
            .field("folder", &self.inner.folder)
            .finish_non_exhaustive()
    }
}

impl Catalog {
    /// Create a catalog with an empty category cache.
    #[must_use]
    pub fn new(
        store: Arc<dyn CatalogStore>,
        media: Arc<dyn MediaUploader>,
        baseline: BaselineOrder,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                store,
                media,
                cache: CategoryCache::new(),
                baseline,
                folder: folder.into(),
            }),
        }
    }

    /// The category cache.
    #[must_use]
    pub fn cache(&self) -> &CategoryCache {
        &self.inner.cache
    }

    /// The baseline used by the order reset.
    #[must_use]
    pub fn baseline(&self) -> &BaselineOrder {
        &self.inner.baseline
    }

    /// Media folder new images are uploaded into.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.inner.folder
    }

    fn store(&self) -> &dyn CatalogStore {
        self.inner.store.as_ref()
    }

    fn media(&self) -> &dyn MediaUploader {
        self.inner.media.as_ref()
    }
}
