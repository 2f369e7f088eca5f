//! Integration tests for Shelf.
//!
//! Every test drives the bot through [`CommandRouter`] exactly as a chat
//! message would, against an in-memory catalog and a fake media store, and
//! then inspects the tables directly.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shelf-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use serde_json::{Value, json};

use shelf_bot::catalog::{BaselineOrder, Catalog};
use shelf_bot::commands::{CommandRouter, Incoming, Reply};
use shelf_bot::db::{MemoryStore, Record, Table, categories, products};
use shelf_bot::media::FakeUploader;
use shelf_core::{Category, CategoryCode, Product, ProductId};

/// A router over a seeded in-memory catalog.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub router: CommandRouter,
    pub store: MemoryStore,
    pub media: FakeUploader,
}

impl TestContext {
    /// Catalog with no rows.
    pub async fn empty() -> Self {
        Self::with_rows(Vec::new(), Vec::new()).await
    }

    /// Categories "4" Fruit (id 1, rank 1, counter 3) and "3" Vegetables
    /// (id 2, rank 2, counter 1); products 10 and 11 in "4" at positions
    /// 1 and 2, product 12 in "3".
    pub async fn standard() -> Self {
        Self::with_rows(
            vec![
                json!({"id": 1, "category": "4", "name": "Fruit", "order": 1, "prcount": 3}),
                json!({"id": 2, "category": "3", "name": "Vegetables", "order": 2, "prcount": 1}),
            ],
            vec![
                json!({"id": 10, "name": "Mango", "photo_url": "https://img.example/10.jpg",
                       "price": "20", "disc_price": "10", "category": "4", "cat_sort": 1}),
                json!({"id": 11, "name": "Papaya", "photo_url": "https://img.example/11.jpg",
                       "price": "16", "disc_price": "8", "category": "4", "cat_sort": 2}),
                json!({"id": 12, "name": "Leek", "photo_url": null,
                       "price": "6", "disc_price": "3", "category": "3", "cat_sort": 1}),
            ],
        )
        .await
    }

    /// Catalog seeded with the given rows and a loaded category cache.
    ///
    /// # Panics
    ///
    /// Panics if the category cache cannot be loaded.
    pub async fn with_rows(categories: Vec<Value>, products: Vec<Value>) -> Self {
        let store = MemoryStore::new();
        store.seed(Table::Categories, categories).await;
        store.seed(Table::Products, products).await;

        let media = FakeUploader::new();
        let catalog = Catalog::new(
            Arc::new(store.clone()),
            Arc::new(media.clone()),
            BaselineOrder::standard(),
            "new_products",
        );
        catalog
            .refresh_categories()
            .await
            .expect("category cache should load from a memory store");

        Self {
            router: CommandRouter::new(catalog),
            store,
            media,
        }
    }

    /// Send a text message.
    pub async fn send(&self, text: &str) -> Reply {
        self.router
            .handle(&Incoming {
                text: text.to_string(),
                image_url: None,
            })
            .await
    }

    /// Send a photo with a caption.
    pub async fn send_photo(&self, caption: &str, image_url: &str) -> Reply {
        self.router
            .handle(&Incoming {
                text: caption.to_string(),
                image_url: Some(image_url.to_string()),
            })
            .await
    }

    /// A live product.
    ///
    /// # Panics
    ///
    /// Panics if the product is not in the live table.
    pub async fn product(&self, id: i64) -> Product {
        products::get(&self.store, ProductId::new(id))
            .await
            .expect("product should be live")
    }

    /// A live product's raw row.
    ///
    /// # Panics
    ///
    /// Panics if the product is not in the live table.
    pub async fn product_record(&self, id: i64) -> Record {
        products::get_record(&self.store, ProductId::new(id))
            .await
            .expect("product should be live")
    }

    /// Whether a product is in the live table.
    pub async fn is_live(&self, id: i64) -> bool {
        products::get(&self.store, ProductId::new(id)).await.is_ok()
    }

    /// A category by code.
    ///
    /// # Panics
    ///
    /// Panics if the code is malformed or no category has it.
    pub async fn category(&self, code: &str) -> Category {
        let code = CategoryCode::parse(code).expect("valid category code");
        categories::get_by_code(&self.store, &code)
            .await
            .expect("category should exist")
    }

    /// `(code, order)` of every category, ordered by id.
    pub async fn category_orders(&self) -> Vec<(String, Option<i32>)> {
        let mut categories = categories::list(&self.store).await.unwrap_or_default();
        categories.sort_by_key(|c| c.id);
        categories
            .into_iter()
            .map(|c| (c.code.into_inner(), c.order))
            .collect()
    }
}
