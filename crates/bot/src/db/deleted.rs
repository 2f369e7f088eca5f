//! Deleted products repository.
//!
//! Rows are copied verbatim from the live table, so they keep their
//! original id and any columns the bot does not model.

use shelf_core::{Product, ProductId};

use super::{CatalogStore, Filter, Record, RepositoryError, Table, decode};
use super::products::ID;

/// List soft-deleted products, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails or a row cannot be decoded.
pub async fn list(store: &dyn CatalogStore) -> Result<Vec<Product>, RepositoryError> {
    store
        .fetch_all(Table::DeletedProducts, None)
        .await?
        .into_iter()
        .map(|record| decode(Table::DeletedProducts, record))
        .collect()
}

/// Get a soft-deleted product row as stored.
///
/// # Errors
///
/// Returns `NotFound` if no deleted product has this id.
pub async fn get_record(store: &dyn CatalogStore, id: ProductId) -> Result<Record, RepositoryError> {
    store
        .fetch_one(Table::DeletedProducts, &Filter::eq(ID, id))
        .await
}

/// Copy a product row into the deleted table.
///
/// # Errors
///
/// Returns `Duplicate` if a deleted row with the same id already exists.
pub async fn insert(store: &dyn CatalogStore, record: Record) -> Result<Record, RepositoryError> {
    store.insert_one(Table::DeletedProducts, record).await
}

/// Remove a row from the deleted table.
///
/// # Errors
///
/// Returns `NotFound` if no deleted product has this id.
pub async fn delete(store: &dyn CatalogStore, id: ProductId) -> Result<(), RepositoryError> {
    store
        .delete_one(Table::DeletedProducts, &Filter::eq(ID, id))
        .await
}
