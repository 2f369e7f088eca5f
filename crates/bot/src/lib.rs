//! Shelf catalog bot.
//!
//! A Telegram bot through which operators maintain a product catalog kept in
//! three tables (live products, categories, deleted products) and a media
//! store. Every multi-row command follows the same consistency protocol:
//! validate, fetch what is needed, upload media, then write in a fixed order
//! so that a failure leaves the smallest possible trace.
//!
//! # Modules
//!
//! - [`catalog`] - Catalog operations and the category cache
//! - [`commands`] - Command parsing, dispatch and replies
//! - [`db`] - Table access over a generic row store
//! - [`media`] - Image upload
//! - [`telegram`] - Bot API transport
//! - [`bot`] - Polling loop

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bot;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod telegram;

use std::sync::Arc;

use tracing::info;

use crate::catalog::Catalog;
use crate::config::CatalogConfig;
use crate::db::{PgCatalogStore, create_pool};
use crate::error::BotError;
use crate::media::CloudinaryUploader;

/// Connect to the database and build a catalog on Cloudinary.
///
/// The category cache starts empty.
///
/// # Errors
///
/// Returns `BotError::Database` if the pool cannot be created.
pub async fn connect(config: &CatalogConfig) -> Result<(Catalog, PgCatalogStore), BotError> {
    let pool = create_pool(&config.database_url, config.max_connections).await?;
    info!(env = ?config.env, "Connected to catalog database");

    let store = PgCatalogStore::new(pool, config.tables.clone());
    let catalog = Catalog::new(
        Arc::new(store.clone()),
        Arc::new(CloudinaryUploader::new(&config.cloudinary)),
        config.baseline.clone(),
        config.cloudinary.folder.clone(),
    );

    Ok((catalog, store))
}
