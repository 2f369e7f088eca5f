//! Telegram Bot API transport.
//!
//! Long polling only; the bot needs no public endpoint.

mod client;
mod error;
mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::{ApiResponse, Chat, File, Message, PhotoSize, Update};
