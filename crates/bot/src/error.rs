//! Process-level errors and Sentry helpers.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::telegram::TelegramError;

/// Errors that stop the bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The database could not be reached at start-up.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The catalog store failed a start-up check.
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),

    /// The Telegram client could not be created.
    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),
}

/// Add a breadcrumb for an operator action.
///
/// Breadcrumbs show up in Sentry reports of a later failure.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

/// Tag later Sentry events with the chat a command came from.
pub fn set_sentry_chat(chat_id: i64) {
    sentry::configure_scope(|scope| {
        scope.set_tag("chat_id", chat_id);
    });
}
