//! Product operations.

use shelf_core::{CategoryCode, NewProduct, Pricing, Product, ProductId};
use tracing::{info, instrument};

use super::error::{CatalogError, Entity, Step};
use super::Catalog;
use crate::db::{RepositoryError, categories, deleted, products};

/// A product with its category's display name from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub product: Product,
    /// `None` when the category code is not in the cache.
    pub category_name: Option<String>,
}

/// Outcome of moving a product to another category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChange {
    /// The product moved; counters were adjusted.
    Moved { category_name: String },
    /// The product was already in that category; nothing was written.
    Unchanged { category_name: String },
}

impl CategoryChange {
    #[must_use]
    pub fn category_name(&self) -> &str {
        match self {
            Self::Moved { category_name } | Self::Unchanged { category_name } => category_name,
        }
    }
}

impl Catalog {
    /// Fetch a product with its category name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no live product has this id.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<ProductView, CatalogError> {
        let product = products::get(self.store(), id)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(id), Step::FetchProduct, e))?;
        let category_name = self.cache().lookup(&product.category).await;

        Ok(ProductView {
            product,
            category_name,
        })
    }

    /// Add a product to a category, appending it at the end.
    ///
    /// Steps: upload the image, read the category counter, insert the product
    /// at position `counter + 1`, write `counter + 1` back. The code is
    /// checked against the cache before anything remote happens.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` and `Upload` leave the store untouched. A failure of
    /// the counter write is a `DependentStep` error: the product exists but
    /// the counter was not bumped.
    #[instrument(skip(self, source_url, name), fields(category = %category))]
    pub async fn add_product(
        &self,
        source_url: &str,
        category: &CategoryCode,
        pricing: Pricing,
        name: &str,
    ) -> Result<Product, CatalogError> {
        if !self.cache().is_valid(category).await {
            return Err(CatalogError::UnknownCategory(category.clone()));
        }

        let image_url = self.media().upload(source_url, self.folder()).await?;

        let target = categories::get_by_code(self.store(), category)
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategory, e))?;
        let position = target.product_count.saturating_add(1);

        let new = NewProduct::new(name, image_url, pricing, category.clone(), position);
        let product = products::insert(self.store(), &new)
            .await
            .map_err(|e| CatalogError::store(Step::InsertProduct, e))?;

        categories::set_product_count(self.store(), target.id, position)
            .await
            .map_err(|e| CatalogError::dependent(Step::UpdateCategory, Step::InsertProduct, e))?;

        info!(product_id = %product.id, position, "Product added");
        Ok(product)
    }

    /// Set the discounted price and its derived list price.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn change_price(
        &self,
        id: ProductId,
        pricing: Pricing,
    ) -> Result<Product, CatalogError> {
        let product = products::set_pricing(self.store(), id, pricing)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(id), Step::UpdateProduct, e))?;

        info!(product_id = %id, price = %product.price, "Price updated");
        Ok(product)
    }

    /// Rename a product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn rename_product(&self, id: ProductId, name: &str) -> Result<Product, CatalogError> {
        let product = products::set_name(self.store(), id, name)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(id), Step::UpdateProduct, e))?;

        info!(product_id = %id, "Product renamed");
        Ok(product)
    }

    /// Upload a new image and point the product at it.
    ///
    /// # Errors
    ///
    /// A failed upload writes nothing. Returns `NotFound` if the product does
    /// not exist.
    #[instrument(skip(self, source_url))]
    pub async fn change_image(
        &self,
        id: ProductId,
        source_url: &str,
    ) -> Result<Product, CatalogError> {
        let image_url = self.media().upload(source_url, self.folder()).await?;

        let product = products::set_image(self.store(), id, &image_url)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(id), Step::UpdateProduct, e))?;

        info!(product_id = %id, "Product image updated");
        Ok(product)
    }

    /// Exchange the sort positions of two products.
    ///
    /// Both products are read before anything is written, so a missing id
    /// never leaves a half swap behind.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for the first missing product. A failure of the
    /// second write is a `DependentStep` error.
    #[instrument(skip(self))]
    pub async fn swap_product_order(
        &self,
        a: ProductId,
        b: ProductId,
    ) -> Result<(), CatalogError> {
        let first = products::get(self.store(), a)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(a), Step::FetchProduct, e))?;
        let second = products::get(self.store(), b)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(b), Step::FetchProduct, e))?;

        if a == b {
            return Ok(());
        }

        products::set_sort_position(self.store(), a, second.sort_position)
            .await
            .map_err(|e| CatalogError::store(Step::UpdateProduct, e))?;
        products::set_sort_position(self.store(), b, first.sort_position)
            .await
            .map_err(|e| CatalogError::dependent(Step::UpdateProduct, Step::UpdateProduct, e))?;

        info!(
            a = %a,
            b = %b,
            a_position = second.sort_position,
            b_position = first.sort_position,
            "Product order swapped"
        );
        Ok(())
    }

    /// Move a product to another category and adjust both counters.
    ///
    /// Writes happen in a fixed order: decrement the old counter, increment
    /// the new one, then reassign the product. Both categories are read
    /// before the first write.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` is checked against the cache before any remote
    /// call. Returns `NotFound` if the product does not exist.
    #[instrument(skip(self), fields(category = %category))]
    pub async fn change_category(
        &self,
        id: ProductId,
        category: &CategoryCode,
    ) -> Result<CategoryChange, CatalogError> {
        let Some(category_name) = self.cache().lookup(category).await else {
            return Err(CatalogError::UnknownCategory(category.clone()));
        };

        let product = products::get(self.store(), id)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(id), Step::FetchProduct, e))?;

        if &product.category == category {
            return Ok(CategoryChange::Unchanged { category_name });
        }

        let old = categories::get_by_code(self.store(), &product.category)
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategory, e))?;
        let new = categories::get_by_code(self.store(), category)
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategory, e))?;

        categories::set_product_count(self.store(), old.id, old.product_count.saturating_sub(1))
            .await
            .map_err(|e| CatalogError::store(Step::UpdateCategory, e))?;
        categories::set_product_count(self.store(), new.id, new.product_count.saturating_add(1))
            .await
            .map_err(|e| CatalogError::dependent(Step::UpdateCategory, Step::UpdateCategory, e))?;
        products::set_category(self.store(), id, category)
            .await
            .map_err(|e| CatalogError::dependent(Step::UpdateProduct, Step::UpdateCategory, e))?;

        info!(
            product_id = %id,
            from = %product.category,
            to = %category,
            "Product category changed"
        );
        Ok(CategoryChange::Moved { category_name })
    }

    /// Soft-delete a product by moving its row to the deleted table.
    ///
    /// The category counter is left as is.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist. If the copy fails
    /// the live row is kept; if the removal fails the row exists in both
    /// tables (`DependentStep`).
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let record = products::get_record(self.store(), id)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Product(id), Step::FetchProduct, e))?;

        deleted::insert(self.store(), record)
            .await
            .map_err(|e| CatalogError::store(Step::CopyToDeleted, e))?;
        products::delete(self.store(), id)
            .await
            .map_err(|e| CatalogError::dependent(Step::DeleteProduct, Step::CopyToDeleted, e))?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Move a soft-deleted product back to the live table.
    ///
    /// The row is inserted as stored, keeping its id. The category counter
    /// is left as is.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no deleted product has this id and `IdInUse` if
    /// a live product already has it (nothing is written in either case).
    #[instrument(skip(self))]
    pub async fn restore_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let record = deleted::get_record(self.store(), id)
            .await
            .map_err(|e| CatalogError::lookup(Entity::DeletedProduct(id), Step::FetchDeleted, e))?;

        products::insert_record(self.store(), record)
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => CatalogError::IdInUse(id),
                other => CatalogError::store(Step::RestoreProduct, other),
            })?;
        deleted::delete(self.store(), id)
            .await
            .map_err(|e| CatalogError::dependent(Step::RemoveDeleted, Step::RestoreProduct, e))?;

        info!(product_id = %id, "Product restored");
        Ok(())
    }

    /// Soft-deleted products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a store error if the table cannot be read.
    #[instrument(skip(self))]
    pub async fn list_deleted(&self) -> Result<Vec<Product>, CatalogError> {
        deleted::list(self.store())
            .await
            .map_err(|e| CatalogError::store(Step::FetchDeleted, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;
    use shelf_core::CategoryId;

    use super::*;
    use crate::catalog::testing::fixture;
    use crate::db::{Operation, Table};

    fn code(s: &str) -> CategoryCode {
        CategoryCode::parse(s).unwrap()
    }

    async fn category_count(catalog: &Catalog, id: i64) -> i32 {
        categories::get(catalog.store(), CategoryId::new(id))
            .await
            .unwrap()
            .product_count
    }

    #[tokio::test]
    async fn test_get_product_uses_cached_name() {
        let (catalog, _, _) = fixture().await;
        let view = catalog.get_product(ProductId::new(10)).await.unwrap();

        assert_eq!(view.product.name, "Mango");
        assert_eq!(view.category_name.as_deref(), Some("Fruit"));
    }

    #[tokio::test]
    async fn test_get_missing_product() {
        let (catalog, _, _) = fixture().await;
        let result = catalog.get_product(ProductId::new(999)).await;
        assert!(matches!(
            result,
            Err(CatalogError::NotFound(Entity::Product(_)))
        ));
    }

    #[tokio::test]
    async fn test_add_product_appends_and_bumps_counter() {
        let (catalog, _, media) = fixture().await;
        let pricing = Pricing::parse_discounted("12").unwrap();

        let product = catalog
            .add_product("https://t.me/file/a.jpg", &code("4"), pricing, "Guava")
            .await
            .unwrap();

        assert_eq!(product.sort_position, 4);
        assert_eq!(product.price, Decimal::from(24));
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://media.invalid/new_products/1.jpg")
        );
        assert_eq!(category_count(&catalog, 1).await, 4);
        assert_eq!(media.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_add_product_unknown_category_makes_no_calls() {
        let (catalog, store, media) = fixture().await;
        let reads = store.read_count().await;
        let pricing = Pricing::parse_discounted("1").unwrap();

        let result = catalog
            .add_product("https://t.me/file/a.jpg", &code("9"), pricing, "Nope")
            .await;

        assert!(matches!(result, Err(CatalogError::UnknownCategory(_))));
        assert_eq!(media.upload_count(), 0);
        assert_eq!(store.read_count().await, reads);
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_product_failed_upload_writes_nothing() {
        let (catalog, store, media) = fixture().await;
        media.set_failing(true);
        let pricing = Pricing::parse_discounted("1").unwrap();

        let result = catalog
            .add_product("https://t.me/file/a.jpg", &code("4"), pricing, "Nope")
            .await;

        assert!(matches!(result, Err(CatalogError::Upload(_))));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_product_counter_failure_is_dependent() {
        let (catalog, store, _) = fixture().await;
        store.fail_next(Table::Categories, Operation::Upsert).await;
        let pricing = Pricing::parse_discounted("1").unwrap();

        let result = catalog
            .add_product("https://t.me/file/a.jpg", &code("4"), pricing, "Half")
            .await;

        match result {
            Err(CatalogError::DependentStep {
                step, committed, ..
            }) => {
                assert_eq!(step, Step::UpdateCategory);
                assert_eq!(committed, Step::InsertProduct);
            }
            other => panic!("expected dependent step failure, got {other:?}"),
        }
        assert_eq!(store.rows(Table::Products).await.len(), 4);
        assert_eq!(category_count(&catalog, 1).await, 3);
    }

    #[tokio::test]
    async fn test_change_price() {
        let (catalog, _, _) = fixture().await;
        let pricing = Pricing::parse_discounted("9.5").unwrap();

        let product = catalog
            .change_price(ProductId::new(12), pricing)
            .await
            .unwrap();
        assert_eq!(product.price, Decimal::from(19));

        let missing = catalog.change_price(ProductId::new(99), pricing).await;
        assert!(matches!(missing, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_change_image_failed_upload_keeps_url() {
        let (catalog, store, media) = fixture().await;
        media.set_failing(true);

        let result = catalog
            .change_image(ProductId::new(10), "https://t.me/file/b.jpg")
            .await;

        assert!(matches!(result, Err(CatalogError::Upload(_))));
        assert_eq!(store.write_count().await, 0);
        let view = catalog.get_product(ProductId::new(10)).await.unwrap();
        assert_eq!(view.product.image_url.as_deref(), Some("https://img/10.jpg"));
    }

    #[tokio::test]
    async fn test_swap_product_order() {
        let (catalog, _, _) = fixture().await;
        catalog
            .swap_product_order(ProductId::new(10), ProductId::new(11))
            .await
            .unwrap();

        let a = catalog.get_product(ProductId::new(10)).await.unwrap();
        let b = catalog.get_product(ProductId::new(11)).await.unwrap();
        assert_eq!(a.product.sort_position, 2);
        assert_eq!(b.product.sort_position, 1);
    }

    #[tokio::test]
    async fn test_swap_with_missing_product_writes_nothing() {
        let (catalog, store, _) = fixture().await;
        let result = catalog
            .swap_product_order(ProductId::new(10), ProductId::new(404))
            .await;

        assert!(matches!(
            result,
            Err(CatalogError::NotFound(Entity::Product(id))) if id == ProductId::new(404)
        ));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_swap_second_write_failure_keeps_first() {
        let (catalog, store, _) = fixture().await;
        store.fail_nth(Table::Products, Operation::Upsert, 2).await;

        let result = catalog
            .swap_product_order(ProductId::new(10), ProductId::new(11))
            .await;

        match result {
            Err(CatalogError::DependentStep {
                step, committed, ..
            }) => {
                assert_eq!(step, Step::UpdateProduct);
                assert_eq!(committed, Step::UpdateProduct);
            }
            other => panic!("expected dependent step failure, got {other:?}"),
        }
        // Both products now share position 2.
        let a = catalog.get_product(ProductId::new(10)).await.unwrap();
        let b = catalog.get_product(ProductId::new(11)).await.unwrap();
        assert_eq!(a.product.sort_position, 2);
        assert_eq!(b.product.sort_position, 2);
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn test_change_category_moves_counters() {
        let (catalog, _, _) = fixture().await;
        let change = catalog
            .change_category(ProductId::new(10), &code("3"))
            .await
            .unwrap();

        assert_eq!(
            change,
            CategoryChange::Moved {
                category_name: "Vegetables".to_string()
            }
        );
        assert_eq!(category_count(&catalog, 1).await, 2);
        assert_eq!(category_count(&catalog, 2).await, 2);
        let view = catalog.get_product(ProductId::new(10)).await.unwrap();
        assert_eq!(view.product.category, code("3"));
    }

    #[tokio::test]
    async fn test_change_category_same_category_is_noop() {
        let (catalog, store, _) = fixture().await;
        let change = catalog
            .change_category(ProductId::new(10), &code("4"))
            .await
            .unwrap();

        assert!(matches!(change, CategoryChange::Unchanged { .. }));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_change_category_failed_decrement_writes_nothing() {
        let (catalog, store, _) = fixture().await;
        store.fail_next(Table::Categories, Operation::Upsert).await;

        let result = catalog
            .change_category(ProductId::new(10), &code("3"))
            .await;
        assert!(matches!(result, Err(CatalogError::Store { step: Step::UpdateCategory, .. })));
        assert_eq!(store.write_count().await, 0);
        assert_eq!(category_count(&catalog, 1).await, 3);
    }

    #[tokio::test]
    async fn test_change_category_failed_increment_keeps_decrement() {
        let (catalog, store, _) = fixture().await;
        store.fail_nth(Table::Categories, Operation::Upsert, 2).await;

        let result = catalog
            .change_category(ProductId::new(10), &code("3"))
            .await;

        match result {
            Err(CatalogError::DependentStep {
                step, committed, ..
            }) => {
                assert_eq!(step, Step::UpdateCategory);
                assert_eq!(committed, Step::UpdateCategory);
            }
            other => panic!("expected dependent step failure, got {other:?}"),
        }
        assert_eq!(category_count(&catalog, 1).await, 2);
        assert_eq!(category_count(&catalog, 2).await, 1);
        let view = catalog.get_product(ProductId::new(10)).await.unwrap();
        assert_eq!(view.product.category, code("4"));
    }

    #[tokio::test]
    async fn test_change_category_failed_reassignment_keeps_counters() {
        let (catalog, store, _) = fixture().await;
        store.fail_next(Table::Products, Operation::Upsert).await;

        let result = catalog
            .change_category(ProductId::new(10), &code("3"))
            .await;

        match result {
            Err(CatalogError::DependentStep {
                step, committed, ..
            }) => {
                assert_eq!(step, Step::UpdateProduct);
                assert_eq!(committed, Step::UpdateCategory);
            }
            other => panic!("expected dependent step failure, got {other:?}"),
        }
        assert_eq!(category_count(&catalog, 1).await, 2);
        assert_eq!(category_count(&catalog, 2).await, 2);
        let view = catalog.get_product(ProductId::new(10)).await.unwrap();
        assert_eq!(view.product.category, code("4"));
    }

    #[tokio::test]
    async fn test_delete_and_restore_round_trip() {
        let (catalog, store, _) = fixture().await;
        let before = store.rows(Table::Products).await;

        catalog.delete_product(ProductId::new(11)).await.unwrap();
        assert_eq!(store.rows(Table::Products).await.len(), 2);
        assert_eq!(catalog.list_deleted().await.unwrap().len(), 1);

        catalog.restore_product(ProductId::new(11)).await.unwrap();
        assert_eq!(store.rows(Table::Products).await, before);
        assert!(store.rows(Table::DeletedProducts).await.is_empty());
        assert_eq!(category_count(&catalog, 1).await, 3);
    }

    #[tokio::test]
    async fn test_delete_keeps_live_row_when_copy_fails() {
        let (catalog, store, _) = fixture().await;
        store.fail_next(Table::DeletedProducts, Operation::Insert).await;

        let result = catalog.delete_product(ProductId::new(10)).await;
        assert!(matches!(result, Err(CatalogError::Store { step: Step::CopyToDeleted, .. })));
        assert_eq!(store.rows(Table::Products).await.len(), 3);
    }

    #[tokio::test]
    async fn test_restore_conflict_is_reported() {
        let (catalog, store, _) = fixture().await;
        store
            .seed(
                Table::DeletedProducts,
                [serde_json::json!({"id": 10, "name": "Old mango", "photo_url": null,
                    "price": "2", "disc_price": "1", "category": "4", "cat_sort": 9})],
            )
            .await;

        let result = catalog.restore_product(ProductId::new(10)).await;
        assert!(matches!(result, Err(CatalogError::IdInUse(_))));
        assert_eq!(store.rows(Table::DeletedProducts).await.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_foreign_key_violation_is_a_store_failure() {
        let (catalog, store, _) = fixture().await;
        catalog.delete_product(ProductId::new(12)).await.unwrap();
        store
            .fail_nth_with(
                Table::Products,
                Operation::Insert,
                1,
                RepositoryError::Conflict("violates foreign key constraint".to_string()),
            )
            .await;

        let result = catalog.restore_product(ProductId::new(12)).await;
        assert!(matches!(
            result,
            Err(CatalogError::Store {
                step: Step::RestoreProduct,
                source: RepositoryError::Conflict(_),
            })
        ));
        assert_eq!(store.rows(Table::DeletedProducts).await.len(), 1);
        assert_eq!(store.rows(Table::Products).await.len(), 2);
    }
}
