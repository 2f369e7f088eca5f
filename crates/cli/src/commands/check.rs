//! Connectivity check.
//!
//! Verifies that the database answers, that every configured table is
//! readable, and that the category cache can be loaded.

use tracing::info;

use shelf_bot::config::CatalogConfig;

/// Check the configured catalog.
///
/// # Errors
///
/// Returns the first failing step.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CatalogConfig::from_env()?;
    info!(
        products = config.tables.products(),
        categories = config.tables.categories(),
        deleted = config.tables.deleted_products(),
        folder = %config.cloudinary.folder,
        "Checking catalog"
    );

    let (catalog, store) = shelf_bot::connect(&config).await?;
    store.ping().await?;
    info!("All tables readable");

    let count = catalog.refresh_categories().await?;
    info!(count, "Category cache loaded");

    Ok(())
}
