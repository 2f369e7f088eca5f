//! Product repository for the live products table.

use serde_json::Value;
use shelf_core::{CategoryCode, NewProduct, Pricing, Product, ProductId};

use super::{CatalogStore, Filter, Record, RepositoryError, Table, decode, encode, field};

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const PHOTO_URL: &str = "photo_url";
pub const PRICE: &str = "price";
pub const DISC_PRICE: &str = "disc_price";
pub const CATEGORY: &str = "category";
pub const CAT_SORT: &str = "cat_sort";

/// Get a product by id.
///
/// # Errors
///
/// Returns `NotFound` if no live product has this id.
pub async fn get(store: &dyn CatalogStore, id: ProductId) -> Result<Product, RepositoryError> {
    let record = get_record(store, id).await?;
    decode(Table::Products, record)
}

/// Get a product row as stored, including columns the bot does not model.
///
/// # Errors
///
/// Returns `NotFound` if no live product has this id.
pub async fn get_record(store: &dyn CatalogStore, id: ProductId) -> Result<Record, RepositoryError> {
    store.fetch_one(Table::Products, &Filter::eq(ID, id)).await
}

/// List live products, optionally restricted to one category.
///
/// # Errors
///
/// Returns an error if the query fails or a row cannot be decoded.
pub async fn list(
    store: &dyn CatalogStore,
    category: Option<&CategoryCode>,
) -> Result<Vec<Product>, RepositoryError> {
    let filter = category.map(|code| Filter::eq(CATEGORY, code));
    store
        .fetch_all(Table::Products, filter.as_ref())
        .await?
        .into_iter()
        .map(|record| decode(Table::Products, record))
        .collect()
}

/// Insert a new product.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn insert(store: &dyn CatalogStore, product: &NewProduct) -> Result<Product, RepositoryError> {
    let record = store.insert_one(Table::Products, encode(product)?).await?;
    decode(Table::Products, record)
}

/// Insert a raw product row, keeping its id and extra columns.
///
/// # Errors
///
/// Returns `Duplicate` if a product with the same id already exists.
pub async fn insert_record(store: &dyn CatalogStore, record: Record) -> Result<Record, RepositoryError> {
    store.insert_one(Table::Products, record).await
}

/// Replace both prices of a product.
///
/// # Errors
///
/// Returns `NotFound` if the product does not exist.
pub async fn set_pricing(
    store: &dyn CatalogStore,
    id: ProductId,
    pricing: Pricing,
) -> Result<Product, RepositoryError> {
    let mut fields = Record::new();
    fields.insert(PRICE.to_owned(), Value::String(pricing.price.to_string()));
    fields.insert(
        DISC_PRICE.to_owned(),
        Value::String(pricing.discounted_price.to_string()),
    );
    update(store, id, fields).await
}

/// Rename a product.
///
/// # Errors
///
/// Returns `NotFound` if the product does not exist.
pub async fn set_name(
    store: &dyn CatalogStore,
    id: ProductId,
    name: &str,
) -> Result<Product, RepositoryError> {
    update(store, id, field(NAME, name)).await
}

/// Replace a product's image URL.
///
/// # Errors
///
/// Returns `NotFound` if the product does not exist.
pub async fn set_image(
    store: &dyn CatalogStore,
    id: ProductId,
    image_url: &str,
) -> Result<Product, RepositoryError> {
    update(store, id, field(PHOTO_URL, image_url)).await
}

/// Move a product to another category (counters are not touched).
///
/// # Errors
///
/// Returns `NotFound` if the product does not exist.
pub async fn set_category(
    store: &dyn CatalogStore,
    id: ProductId,
    category: &CategoryCode,
) -> Result<Product, RepositoryError> {
    update(store, id, field(CATEGORY, category.as_str())).await
}

/// Set a product's position within its category.
///
/// # Errors
///
/// Returns `NotFound` if the product does not exist.
pub async fn set_sort_position(
    store: &dyn CatalogStore,
    id: ProductId,
    position: i32,
) -> Result<Product, RepositoryError> {
    update(store, id, field(CAT_SORT, position)).await
}

/// Delete a live product row.
///
/// # Errors
///
/// Returns `NotFound` if the product does not exist.
pub async fn delete(store: &dyn CatalogStore, id: ProductId) -> Result<(), RepositoryError> {
    store.delete_one(Table::Products, &Filter::eq(ID, id)).await
}

async fn update(
    store: &dyn CatalogStore,
    id: ProductId,
    fields: Record,
) -> Result<Product, RepositoryError> {
    let record = store
        .upsert_one(Table::Products, &Filter::eq(ID, id), fields)
        .await?;
    decode(Table::Products, record)
}
