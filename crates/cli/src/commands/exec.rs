//! Run one chat command from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Against the configured database and Cloudinary account
//! shelf-cli exec "/get 10"
//!
//! # Commands that take an image need a downloadable URL
//! shelf-cli exec "/ci 10" --image-url https://example.com/mango.jpg
//!
//! # Dry run against an in-memory copy loaded from a JSON file
//! shelf-cli exec "/cpc 10 3" --memory --seed catalog.json
//! ```
//!
//! A seed file holds one array of rows per table:
//!
//! ```json
//! {
//!   "categories": [{"id": 1, "category": "4", "name": "Fruit", "order": 1, "prcount": 1}],
//!   "products": [{"id": 10, "name": "Mango", "photo_url": null, "price": "20",
//!                 "disc_price": "10", "category": "4", "cat_sort": 1}],
//!   "deleted_products": []
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use shelf_bot::catalog::{BaselineOrder, Catalog};
use shelf_bot::commands::{CommandRouter, Incoming, Reply};
use shelf_bot::config::CatalogConfig;
use shelf_bot::db::{MemoryStore, Table};
use shelf_bot::media::FakeUploader;

/// Folder used for uploads in memory mode.
const MEMORY_FOLDER: &str = "new_products";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid seed file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Rows to load into the in-memory store.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub products: Vec<Value>,
    #[serde(default)]
    pub categories: Vec<Value>,
    #[serde(default)]
    pub deleted_products: Vec<Value>,
}

impl SeedFile {
    /// Load a seed file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a seed file.
    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Read {
                path: display.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| SeedError::Parse {
            path: display,
            source,
        })
    }

    async fn apply(self, store: &MemoryStore) {
        store.seed(Table::Products, self.products).await;
        store.seed(Table::Categories, self.categories).await;
        store
            .seed(Table::DeletedProducts, self.deleted_products)
            .await;
    }
}

/// Run a command against the configured catalog.
///
/// # Errors
///
/// Returns an error if configuration is missing or the database is unreachable.
pub async fn remote(text: &str, image_url: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = CatalogConfig::from_env()?;
    let (catalog, _) = shelf_bot::connect(&config).await?;
    catalog.refresh_categories().await?;

    let reply = run(catalog, text, image_url).await;
    print_reply(&reply);
    Ok(())
}

/// Run a command against an in-memory catalog and print the resulting tables.
///
/// # Errors
///
/// Returns an error if the seed file cannot be loaded.
pub async fn memory(
    text: &str,
    image_url: Option<String>,
    seed: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    if let Some(path) = seed {
        SeedFile::load(path).await?.apply(&store).await;
        info!(path = %path.display(), "Loaded seed file");
    }

    let catalog = Catalog::new(
        Arc::new(store.clone()),
        Arc::new(FakeUploader::new()),
        BaselineOrder::standard(),
        MEMORY_FOLDER,
    );
    catalog.refresh_categories().await?;

    let reply = run(catalog, text, image_url).await;
    print_reply(&reply);

    for table in [Table::Categories, Table::Products, Table::DeletedProducts] {
        let rows = store.rows(table).await;
        info!("{table}: {}", serde_json::to_string_pretty(&rows)?);
    }
    Ok(())
}

async fn run(catalog: Catalog, text: &str, image_url: Option<String>) -> Reply {
    let router = CommandRouter::new(catalog);
    router
        .handle(&Incoming {
            text: text.to_string(),
            image_url,
        })
        .await
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Text(text) => info!("{text}"),
        Reply::Photo { url, caption } => {
            info!("[photo] {url}");
            info!("{caption}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_file_tables_default_to_empty() {
        let seed: SeedFile =
            serde_json::from_str(r#"{"categories": [{"id": 1, "category": "4"}]}"#).unwrap();
        assert_eq!(seed.categories.len(), 1);
        assert!(seed.products.is_empty());
        assert!(seed.deleted_products.is_empty());
    }

    #[test]
    fn test_seed_file_rejects_unknown_tables() {
        let result: Result<SeedFile, _> = serde_json::from_str(r#"{"orders": []}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_seed_applies_to_store() {
        let seed: SeedFile = serde_json::from_str(
            r#"{
                "categories": [{"id": 1, "category": "4", "name": "Fruit", "order": 1, "prcount": 1}],
                "products": [{"id": 10, "name": "Mango", "category": "4", "cat_sort": 1}]
            }"#,
        )
        .unwrap();
        let store = MemoryStore::new();
        seed.apply(&store).await;

        assert_eq!(store.rows(Table::Categories).await.len(), 1);
        assert_eq!(store.rows(Table::Products).await.len(), 1);
        assert!(store.rows(Table::DeletedProducts).await.is_empty());
    }

    #[tokio::test]
    async fn test_documented_seed_answers_get() {
        let seed: SeedFile = serde_json::from_str(
            r#"{
                "categories": [{"id": 1, "category": "4", "name": "Fruit", "order": 1, "prcount": 1}],
                "products": [{"id": 10, "name": "Mango", "photo_url": null, "price": "20",
                              "disc_price": "10", "category": "4", "cat_sort": 1}],
                "deleted_products": []
            }"#,
        )
        .unwrap();
        let store = MemoryStore::new();
        seed.apply(&store).await;
        let catalog = Catalog::new(
            Arc::new(store),
            Arc::new(FakeUploader::new()),
            BaselineOrder::standard(),
            MEMORY_FOLDER,
        );
        catalog.refresh_categories().await.unwrap();

        let Reply::Text(text) = run(catalog, "/get 10", None).await else {
            panic!("expected a text reply for a product without a photo");
        };
        assert!(text.contains("Name: Mango"));
        assert!(text.contains("Price: 20"));
        assert!(text.contains("Discounted Price: 10"));
    }

    #[tokio::test]
    async fn test_missing_seed_file() {
        let result = SeedFile::load(Path::new("/nonexistent/catalog.json")).await;
        assert!(matches!(result, Err(SeedError::Read { .. })));
    }
}
