//! Polling loop.
//!
//! Updates are handled one at a time, in the order Telegram delivers them,
//! so two catalog commands never interleave within this process.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::commands::{Command, CommandRouter, Reply, replies};
use crate::error::set_sentry_chat;
use crate::telegram::{Message, TelegramClient, TelegramError, Update};

/// Delay before polling again after a failed `getUpdates`.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// A Telegram bot running catalog commands.
#[derive(Debug, Clone)]
pub struct Bot {
    client: TelegramClient,
    router: CommandRouter,
}

impl Bot {
    #[must_use]
    pub const fn new(client: TelegramClient, router: CommandRouter) -> Self {
        Self { client, router }
    }

    /// Poll and handle updates until `shutdown` resolves.
    ///
    /// A command that is running when the signal arrives is finished first.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset = 0_i64;
        info!("Polling for updates");

        loop {
            let updates = tokio::select! {
                () = &mut shutdown => break,
                result = self.client.get_updates(offset) => result,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Polling failed, retrying");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                    }
                }
            }
        }

        info!("Polling stopped");
    }

    async fn handle_update(&self, update: Update) {
        if let Some(message) = update.message {
            self.handle_message(&message).await;
        }
    }

    #[instrument(skip_all, fields(chat_id = message.chat.id, message_id = message.message_id))]
    async fn handle_message(&self, message: &Message) {
        let Some(text) = message.command_text() else {
            return;
        };
        let chat_id = message.chat.id;
        set_sentry_chat(chat_id);

        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(e) => {
                self.send(chat_id, &CommandRouter::reject(&e)).await;
                return;
            }
        };

        let photo = message.largest_photo();
        if let Some(ack) = CommandRouter::acknowledgement(&command, photo.is_some()) {
            self.send(chat_id, &Reply::Text(ack.to_string())).await;
        }

        let image_url = match photo.filter(|_| command.needs_image()) {
            Some(photo) => match self.client.resolve_file_url(&photo.file_id).await {
                Ok(url) => Some(url),
                Err(e) => {
                    error!(error = %e, "Could not resolve photo");
                    self.send(chat_id, &Reply::Text(replies::UPLOAD_FAILED.to_string()))
                        .await;
                    return;
                }
            },
            None => None,
        };

        let reply = self.router.dispatch(command, image_url.as_deref()).await;
        self.send(chat_id, &reply).await;
    }

    async fn send(&self, chat_id: i64, reply: &Reply) {
        let result = match reply {
            Reply::Text(text) => self.send_text(chat_id, text).await,
            Reply::Photo { url, caption } => {
                match self.client.send_photo(chat_id, url, caption).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!(error = %e, "Photo not sent, sending caption only");
                        self.send_text(chat_id, caption).await
                    }
                }
            }
        };

        if let Err(e) = result {
            error!(error = %e, "Failed to send reply");
        }
    }

    /// Send text as one or more messages within Telegram's length limit.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        for chunk in replies::split_message(text, replies::MESSAGE_LIMIT) {
            self.client.send_message(chat_id, &chunk).await?;
        }
        Ok(())
    }
}
