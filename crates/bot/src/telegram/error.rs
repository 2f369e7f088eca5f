//! Telegram-related errors.

use thiserror::Error;

/// Errors that can occur when talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// HTTP request failed.
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Telegram response error: {0}")]
    Response(String),

    /// The Bot API returned an error.
    #[error("Telegram API error ({code}): {description}")]
    Api { code: i32, description: String },

    /// A file has no download path (too large or expired).
    #[error("file {0} cannot be downloaded")]
    NoFilePath(String),
}
