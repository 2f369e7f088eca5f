//! Category repository.

use shelf_core::{Category, CategoryCode, CategoryId, NewCategory};

use super::{CatalogStore, Filter, Record, RepositoryError, Table, decode, encode, field};

pub const ID: &str = "id";
pub const CODE: &str = "category";
pub const NAME: &str = "name";
pub const ORDER: &str = "order";
pub const PRCOUNT: &str = "prcount";

/// Get a category by id.
///
/// # Errors
///
/// Returns `NotFound` if the category does not exist.
pub async fn get(store: &dyn CatalogStore, id: CategoryId) -> Result<Category, RepositoryError> {
    let record = store.fetch_one(Table::Categories, &Filter::eq(ID, id)).await?;
    decode(Table::Categories, record)
}

/// Get a category by its code.
///
/// # Errors
///
/// Returns `NotFound` if no category has this code, `DataCorruption` if
/// several do.
pub async fn get_by_code(
    store: &dyn CatalogStore,
    code: &CategoryCode,
) -> Result<Category, RepositoryError> {
    let record = store
        .fetch_one(Table::Categories, &Filter::eq(CODE, code))
        .await?;
    decode(Table::Categories, record)
}

/// List every category, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails or a row cannot be decoded.
pub async fn list(store: &dyn CatalogStore) -> Result<Vec<Category>, RepositoryError> {
    store
        .fetch_all(Table::Categories, None)
        .await?
        .into_iter()
        .map(|record| decode(Table::Categories, record))
        .collect()
}

/// Insert a new category.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn insert(
    store: &dyn CatalogStore,
    category: &NewCategory,
) -> Result<Category, RepositoryError> {
    let record = store
        .insert_one(Table::Categories, encode(category)?)
        .await?;
    decode(Table::Categories, record)
}

/// Rename a category.
///
/// # Errors
///
/// Returns `NotFound` if the category does not exist.
pub async fn set_name(
    store: &dyn CatalogStore,
    id: CategoryId,
    name: &str,
) -> Result<Category, RepositoryError> {
    update(store, id, field(NAME, name)).await
}

/// Set (or clear) a category's listing rank.
///
/// # Errors
///
/// Returns `NotFound` if the category does not exist.
pub async fn set_order(
    store: &dyn CatalogStore,
    id: CategoryId,
    order: Option<i32>,
) -> Result<Category, RepositoryError> {
    update(store, id, field(ORDER, order)).await
}

/// Overwrite a category's product counter.
///
/// # Errors
///
/// Returns `NotFound` if the category does not exist.
pub async fn set_product_count(
    store: &dyn CatalogStore,
    id: CategoryId,
    count: i32,
) -> Result<Category, RepositoryError> {
    update(store, id, field(PRCOUNT, count)).await
}

async fn update(
    store: &dyn CatalogStore,
    id: CategoryId,
    fields: Record,
) -> Result<Category, RepositoryError> {
    let record = store
        .upsert_one(Table::Categories, &Filter::eq(ID, id), fields)
        .await?;
    decode(Table::Categories, record)
}
