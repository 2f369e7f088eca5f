//! Category operations.

use std::collections::HashMap;

use shelf_core::{Category, CategoryCode, CategoryId, NewCategory};
use tracing::{info, instrument, warn};

use super::Catalog;
use super::error::{CatalogError, Entity, Step};
use crate::db::{categories, products};

/// Result of resetting category ranks to the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderReset {
    /// Categories whose rank was written.
    pub updated: usize,
    /// Codes the baseline has no rank for; their rank was left as is.
    pub unranked: Vec<CategoryCode>,
}

/// A counter that did not match the number of live products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterCorrection {
    pub code: CategoryCode,
    pub before: i32,
    pub after: i32,
}

impl Catalog {
    /// Rebuild the category cache from the store.
    ///
    /// # Errors
    ///
    /// Returns a store error; the previous cache is kept.
    pub async fn refresh_categories(&self) -> Result<usize, CatalogError> {
        self.cache()
            .refresh(self.store())
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategories, e))
    }

    /// Every category in listing order.
    ///
    /// # Errors
    ///
    /// Returns a store error if the table cannot be read.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let mut categories = categories::list(self.store())
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategories, e))?;
        categories.sort_by(Category::listing_cmp);
        Ok(categories)
    }

    /// Create a category ranked after every existing one, with no products.
    ///
    /// The cache is not updated; `updatecat` makes the code usable.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCategory` if the code is taken.
    #[instrument(skip(self, name), fields(code = %code))]
    pub async fn add_category(
        &self,
        code: &CategoryCode,
        name: &str,
    ) -> Result<Category, CatalogError> {
        let existing = categories::list(self.store())
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategories, e))?;

        if existing.iter().any(|c| &c.code == code) {
            return Err(CatalogError::DuplicateCategory(code.clone()));
        }

        let order = i32::try_from(existing.len())
            .unwrap_or(i32::MAX)
            .saturating_add(1);
        let new = NewCategory {
            code: code.clone(),
            name: name.to_owned(),
            order,
            product_count: 0,
        };
        let category = categories::insert(self.store(), &new)
            .await
            .map_err(|e| CatalogError::store(Step::InsertCategory, e))?;

        info!(category_id = %category.id, order, "Category added");
        Ok(category)
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the category does not exist.
    #[instrument(skip(self))]
    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: &str,
    ) -> Result<Category, CatalogError> {
        let category = categories::set_name(self.store(), id, name)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Category(id), Step::UpdateCategory, e))?;

        info!(category_id = %id, "Category renamed");
        Ok(category)
    }

    /// Exchange the listing ranks of two categories.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for the first missing category, before any write.
    /// A failure of the second write is a `DependentStep` error.
    #[instrument(skip(self))]
    pub async fn swap_category_order(
        &self,
        a: CategoryId,
        b: CategoryId,
    ) -> Result<(), CatalogError> {
        let first = categories::get(self.store(), a)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Category(a), Step::FetchCategory, e))?;
        let second = categories::get(self.store(), b)
            .await
            .map_err(|e| CatalogError::lookup(Entity::Category(b), Step::FetchCategory, e))?;

        if a == b {
            return Ok(());
        }

        categories::set_order(self.store(), a, second.order)
            .await
            .map_err(|e| CatalogError::store(Step::UpdateCategory, e))?;
        categories::set_order(self.store(), b, first.order)
            .await
            .map_err(|e| CatalogError::dependent(Step::UpdateCategory, Step::UpdateCategory, e))?;

        info!(a = %a, b = %b, "Category order swapped");
        Ok(())
    }

    /// Write the baseline rank of every category the baseline knows.
    ///
    /// Rows already at their rank are skipped, so running it again writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Stops at the first failed write; a failure after an earlier write is
    /// a `DependentStep` error.
    #[instrument(skip(self))]
    pub async fn reset_category_order(&self) -> Result<OrderReset, CatalogError> {
        let all = categories::list(self.store())
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategories, e))?;

        let mut report = OrderReset::default();
        for category in all {
            let Some(rank) = self.baseline().rank(&category.code) else {
                report.unranked.push(category.code);
                continue;
            };
            if category.order == Some(rank) {
                continue;
            }

            categories::set_order(self.store(), category.id, Some(rank))
                .await
                .map_err(|e| {
                    if report.updated == 0 {
                        CatalogError::store(Step::UpdateCategory, e)
                    } else {
                        CatalogError::dependent(Step::UpdateCategory, Step::UpdateCategory, e)
                    }
                })?;
            report.updated += 1;
        }

        if !report.unranked.is_empty() {
            warn!(unranked = ?report.unranked, "Categories without a baseline rank");
        }
        info!(updated = report.updated, "Category order reset");
        Ok(report)
    }

    /// Set every category counter to its number of live products.
    ///
    /// Returns the counters that changed.
    ///
    /// # Errors
    ///
    /// Stops at the first failed write; a failure after an earlier write is
    /// a `DependentStep` error.
    #[instrument(skip(self))]
    pub async fn recount_categories(&self) -> Result<Vec<CounterCorrection>, CatalogError> {
        let all = categories::list(self.store())
            .await
            .map_err(|e| CatalogError::store(Step::FetchCategories, e))?;
        let live = products::list(self.store(), None)
            .await
            .map_err(|e| CatalogError::store(Step::FetchProducts, e))?;

        let mut counts: HashMap<CategoryCode, i32> = HashMap::new();
        for product in live {
            let count = counts.entry(product.category).or_default();
            *count = count.saturating_add(1);
        }

        let mut corrections = Vec::new();
        for category in all {
            let actual = counts.get(&category.code).copied().unwrap_or(0);
            if actual == category.product_count {
                continue;
            }

            categories::set_product_count(self.store(), category.id, actual)
                .await
                .map_err(|e| {
                    if corrections.is_empty() {
                        CatalogError::store(Step::UpdateCategory, e)
                    } else {
                        CatalogError::dependent(Step::UpdateCategory, Step::UpdateCategory, e)
                    }
                })?;
            corrections.push(CounterCorrection {
                code: category.code,
                before: category.product_count,
                after: actual,
            });
        }

        info!(corrected = corrections.len(), "Category counters recounted");
        Ok(corrections)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::testing::fixture;
    use crate::db::{Operation, Table};

    fn code(s: &str) -> CategoryCode {
        CategoryCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_list_categories_in_listing_order() {
        let (catalog, store, _) = fixture().await;
        store
            .seed(
                Table::Categories,
                [json!({"id": 3, "category": "X", "name": "Misc", "order": null, "prcount": 0})],
            )
            .await;
        catalog
            .swap_category_order(CategoryId::new(1), CategoryId::new(2))
            .await
            .unwrap();

        let codes: Vec<String> = catalog
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.code.into_inner())
            .collect();
        assert_eq!(codes, vec!["3", "4", "X"]);
    }

    #[tokio::test]
    async fn test_add_category_ranks_last() {
        let (catalog, _, _) = fixture().await;
        let category = catalog.add_category(&code("B"), "Bakery").await.unwrap();

        assert_eq!(category.order, Some(3));
        assert_eq!(category.product_count, 0);
        assert!(!catalog.cache().is_valid(&code("B")).await);
    }

    #[tokio::test]
    async fn test_add_duplicate_category() {
        let (catalog, store, _) = fixture().await;
        let result = catalog.add_category(&code("4"), "Again").await;

        assert!(matches!(result, Err(CatalogError::DuplicateCategory(_))));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_rename_missing_category() {
        let (catalog, _, _) = fixture().await;
        let result = catalog.rename_category(CategoryId::new(77), "Ghost").await;
        assert!(matches!(
            result,
            Err(CatalogError::NotFound(Entity::Category(_)))
        ));
    }

    #[tokio::test]
    async fn test_swap_category_order_failed_first_write() {
        let (catalog, store, _) = fixture().await;
        store.fail_next(Table::Categories, Operation::Upsert).await;

        let first = catalog
            .swap_category_order(CategoryId::new(1), CategoryId::new(2))
            .await;
        assert!(matches!(first, Err(CatalogError::Store { .. })));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_swap_category_order_failed_second_write() {
        let (catalog, store, _) = fixture().await;
        store.fail_nth(Table::Categories, Operation::Upsert, 2).await;

        let result = catalog
            .swap_category_order(CategoryId::new(1), CategoryId::new(2))
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

        let first = categories::get(catalog.store(), CategoryId::new(1)).await.unwrap();
        let second = categories::get(catalog.store(), CategoryId::new(2)).await.unwrap();
        assert_eq!(first.order, Some(2));
        assert_eq!(second.order, Some(2));
    }

    #[tokio::test]
    async fn test_reset_order_reports_unranked() {
        let (catalog, store, _) = fixture().await;
        store
            .seed(
                Table::Categories,
                [json!({"id": 3, "category": "X", "name": "Misc", "order": 7, "prcount": 0})],
            )
            .await;
        catalog
            .swap_category_order(CategoryId::new(1), CategoryId::new(2))
            .await
            .unwrap();

        let report = catalog.reset_category_order().await.unwrap();
        assert_eq!(report.updated, 2);
        assert_eq!(report.unranked, vec![code("X")]);

        let second = catalog.reset_category_order().await.unwrap();
        assert_eq!(second.updated, 0);

        let x = categories::get(catalog.store(), CategoryId::new(3)).await.unwrap();
        assert_eq!(x.order, Some(7));
    }

    #[tokio::test]
    async fn test_recount_corrects_drift() {
        let (catalog, _, _) = fixture().await;

        let corrections = catalog.recount_categories().await.unwrap();
        assert_eq!(
            corrections,
            vec![CounterCorrection {
                code: code("4"),
                before: 3,
                after: 2,
            }]
        );
        assert!(catalog.recount_categories().await.unwrap().is_empty());
    }
}
