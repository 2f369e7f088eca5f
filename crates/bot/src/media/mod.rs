//! Image hosting.
//!
//! Telegram file URLs embed the bot token and expire, so every image is
//! re-hosted before a product row references it. [`MediaUploader`] takes a
//! remote source URL and returns a durable URL.

mod cloudinary;
mod fake;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

pub use cloudinary::CloudinaryUploader;
pub use fake::FakeUploader;

/// Errors that can occur when uploading an image.
#[derive(Debug, Error)]
pub enum UploadError {
    /// HTTP request failed.
    #[error("upload request failed: {0}")]
    Request(String),

    /// The media API rejected the upload.
    #[error("media API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("upload response error: {0}")]
    Response(String),
}

/// Stores a remote image and returns its durable URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload the image at `source_url` into `folder`.
    async fn upload(&self, source_url: &str, folder: &str) -> Result<String, UploadError>;
}

/// Digest used to sign upload requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

/// Unknown signature algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown signature algorithm '{0}' (expected sha1 or sha256)")]
pub struct UnknownAlgorithm(String);

impl FromStr for SignatureAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            _ => Err(UnknownAlgorithm(s.to_owned())),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("SHA256".parse(), Ok(SignatureAlgorithm::Sha256));
        assert_eq!("sha1".parse(), Ok(SignatureAlgorithm::Sha1));
        assert!("md5".parse::<SignatureAlgorithm>().is_err());
    }
}
