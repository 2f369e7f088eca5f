//! Telegram Bot API client.
//!
//! Every method URL and file download URL contains the bot token, so URLs
//! are never logged.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use super::error::TelegramError;
use super::types::{ApiResponse, File, GetFile, GetUpdates, SendMessage, SendPhoto, Update};
use crate::config::TelegramConfig;

/// Slack between the long-poll timeout and the HTTP timeout.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

struct TelegramClientInner {
    client: Client,
    bot_token: SecretString,
    api_base: String,
    poll_timeout: Duration,
}

/// Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    inner: Arc<TelegramClientInner>,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.inner.api_base)
            .field("poll_timeout", &self.inner.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(config.poll_timeout + REQUEST_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| TelegramError::Request(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(TelegramClientInner {
                client,
                bot_token: config.bot_token.clone(),
                api_base: config.api_base.clone(),
                poll_timeout: config.poll_timeout,
            }),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.inner.api_base,
            self.inner.bot_token.expose_secret()
        )
    }

    /// Long-poll for updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdates {
            offset,
            timeout: self.inner.poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &request).await?;

        if !updates.is_empty() {
            debug!(count = updates.len(), "Received updates");
        }
        Ok(updates)
    }

    /// Send a text message.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessage { chat_id, text })
            .await?;
        Ok(())
    }

    /// Send a photo by URL with a caption.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self, caption))]
    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TelegramError> {
        let request = SendPhoto {
            chat_id,
            photo: photo_url,
            caption,
        };
        let _: serde_json::Value = self.call("sendPhoto", &request).await?;
        Ok(())
    }

    /// Look up a file's download path.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self))]
    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &GetFile { file_id }).await
    }

    /// Download URL of a file. Contains the bot token.
    ///
    /// # Errors
    ///
    /// Returns `NoFilePath` if Telegram did not provide a path.
    pub fn file_url(&self, file: &File) -> Result<String, TelegramError> {
        let path = file
            .file_path
            .as_deref()
            .ok_or_else(|| TelegramError::NoFilePath(file.file_id.clone()))?;
        Ok(format!(
            "{}/file/bot{}/{path}",
            self.inner.api_base,
            self.inner.bot_token.expose_secret()
        ))
    }

    /// Resolve a file id straight to its download URL.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be looked up.
    pub async fn resolve_file_url(&self, file_id: &str) -> Result<String, TelegramError> {
        let file = self.get_file(file_id).await?;
        self.file_url(&file)
    }

    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TelegramError> {
        let response = self
            .inner
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TelegramError::Request(e.without_url().to_string()))?;

        Self::handle_response(method, response).await
    }

    /// Unwrap the `{ok, result}` envelope.
    async fn handle_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, TelegramError> {
        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Response(e.without_url().to_string()))?;

        if !envelope.ok {
            let code = envelope
                .error_code
                .unwrap_or_else(|| i32::from(status.as_u16()));
            let description = envelope
                .description
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(method, code, description = %description, "Telegram API error");
            return Err(TelegramError::Api { code, description });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Response(format!("{method} returned no result")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> TelegramClient {
        TelegramClient::new(&TelegramConfig {
            bot_token: SecretString::from("123456789:AAHk3vQ9xZ2mPq7LrT5wYb8NcJ4dFg6HsUe"),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout: Duration::from_secs(30),
        })
        .unwrap()
    }

    #[test]
    fn test_file_url() {
        let file = File {
            file_id: "abc".to_string(),
            file_path: Some("photos/file_1.jpg".to_string()),
        };
        assert_eq!(
            client().file_url(&file).unwrap(),
            "https://api.telegram.org/file/bot123456789:AAHk3vQ9xZ2mPq7LrT5wYb8NcJ4dFg6HsUe/photos/file_1.jpg"
        );
    }

    #[test]
    fn test_file_without_path() {
        let file = File {
            file_id: "abc".to_string(),
            file_path: None,
        };
        assert!(matches!(
            client().file_url(&file),
            Err(TelegramError::NoFilePath(id)) if id == "abc"
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", client());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("AAHk3vQ9"));
    }
}
