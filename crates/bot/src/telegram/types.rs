//! Telegram Bot API types.
//!
//! Only the fields the bot reads are modelled; unknown fields are ignored.
//!
//! See: <https://core.telegram.org/bots/api>

use serde::{Deserialize, Serialize};

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
}

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    /// Available sizes of an attached photo, smallest first.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

impl Message {
    /// Text of a text message, or caption of a photo.
    #[must_use]
    pub fn command_text(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// The largest size of the attached photo.
    #[must_use]
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo.iter().max_by_key(|size| {
            size.file_size
                .unwrap_or_else(|| u64::from(size.width) * u64::from(size.height))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// A file ready to be downloaded.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GetUpdates {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: [&'static str; 1],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SendPhoto<'a> {
    pub chat_id: i64,
    pub photo: &'a str,
    pub caption: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GetFile<'a> {
    pub file_id: &'a str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_photo_update() {
        let response: ApiResponse<Vec<Update>> = serde_json::from_value(json!({
            "ok": true,
            "result": [{
                "update_id": 501,
                "message": {
                    "message_id": 7,
                    "date": 1_700_000_000,
                    "chat": {"id": 42, "type": "private"},
                    "caption": "/ci 10",
                    "photo": [
                        {"file_id": "small", "file_unique_id": "a", "width": 90, "height": 90, "file_size": 1200},
                        {"file_id": "large", "file_unique_id": "b", "width": 800, "height": 800, "file_size": 64000}
                    ]
                }
            }]
        }))
        .unwrap();

        let updates = response.result.unwrap();
        let message = updates.first().and_then(|u| u.message.as_ref()).unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.command_text(), Some("/ci 10"));
        assert_eq!(message.largest_photo().unwrap().file_id, "large");
    }

    #[test]
    fn test_decode_error_response() {
        let response: ApiResponse<File> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: invalid file_id"
        }))
        .unwrap();

        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(400));
    }

    #[test]
    fn test_updates_without_message_are_kept() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 9,
            "edited_message": {"message_id": 1}
        }))
        .unwrap();
        assert!(update.message.is_none());
    }
}
