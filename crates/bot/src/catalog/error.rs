//! Catalog protocol errors.

use std::fmt;

use shelf_core::{CategoryCode, CategoryId, ProductId};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::media::UploadError;

/// A remote step of a catalog operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchProduct,
    FetchCategory,
    FetchCategories,
    FetchProducts,
    FetchDeleted,
    InsertProduct,
    UpdateProduct,
    UpdateCategory,
    InsertCategory,
    CopyToDeleted,
    DeleteProduct,
    RestoreProduct,
    RemoveDeleted,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FetchProduct => "fetch product",
            Self::FetchCategory => "fetch category",
            Self::FetchCategories => "fetch categories",
            Self::FetchProducts => "fetch products",
            Self::FetchDeleted => "fetch deleted product",
            Self::InsertProduct => "insert product",
            Self::UpdateProduct => "update product",
            Self::UpdateCategory => "update category",
            Self::InsertCategory => "insert category",
            Self::CopyToDeleted => "copy product to deleted table",
            Self::DeleteProduct => "delete product",
            Self::RestoreProduct => "restore product",
            Self::RemoveDeleted => "remove deleted product",
        })
    }
}

/// The row a lookup was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Product(ProductId),
    Category(CategoryId),
    DeletedProduct(ProductId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product(id) => write!(f, "product {id}"),
            Self::Category(id) => write!(f, "category {id}"),
            Self::DeletedProduct(id) => write!(f, "deleted product {id}"),
        }
    }
}

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The referenced row does not exist.
    #[error("{0} not found")]
    NotFound(Entity),

    /// The category code is not in the category cache.
    #[error("unknown category '{0}'")]
    UnknownCategory(CategoryCode),

    /// A category with this code already exists.
    #[error("category code '{0}' already exists")]
    DuplicateCategory(CategoryCode),

    /// A live product already has the id being restored.
    #[error("a live product already uses id {0}")]
    IdInUse(ProductId),

    /// The image could not be uploaded; nothing was written.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// A step failed before anything was written.
    #[error("{step} failed: {source}")]
    Store {
        step: Step,
        #[source]
        source: RepositoryError,
    },

    /// A step failed after an earlier step had already been committed.
    ///
    /// Earlier writes are left in place.
    #[error("{step} failed after {committed} was committed: {source}")]
    DependentStep {
        step: Step,
        committed: Step,
        #[source]
        source: RepositoryError,
    },
}

impl CatalogError {
    /// Failure of the first write (or of a read before any write).
    pub(crate) const fn store(step: Step, source: RepositoryError) -> Self {
        Self::Store { step, source }
    }

    /// Failure after `committed` has already been written.
    pub(crate) const fn dependent(step: Step, committed: Step, source: RepositoryError) -> Self {
        Self::DependentStep {
            step,
            committed,
            source,
        }
    }

    /// Map `NotFound` to the entity and anything else to a store failure.
    pub(crate) fn lookup(entity: Entity, step: Step, source: RepositoryError) -> Self {
        match source {
            RepositoryError::NotFound => Self::NotFound(entity),
            other => Self::store(step, other),
        }
    }

    /// The step that failed, if a store call failed.
    #[must_use]
    pub const fn failed_step(&self) -> Option<Step> {
        match self {
            Self::Store { step, .. } | Self::DependentStep { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// True if earlier writes of the operation were committed.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::DependentStep { .. })
    }

    /// True if the store rejected a value for its column type.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Store {
                source: RepositoryError::InvalidInput(_),
                ..
            }
        )
    }

    /// True for failures worth reporting beyond the log.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Self::Store { .. } | Self::DependentStep { .. } | Self::Upload(_)
        )
    }
}
