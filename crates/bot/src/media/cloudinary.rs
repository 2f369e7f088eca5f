//! Cloudinary upload API client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, error, instrument};

use super::{MediaUploader, SignatureAlgorithm, UploadError};
use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed uploads to Cloudinary.
///
/// The digest must match the account's signature algorithm setting.
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    algorithm: SignatureAlgorithm,
}

impl std::fmt::Debug for CloudinaryUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryUploader")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl CloudinaryUploader {
    /// Create an uploader from configuration.
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            client: Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            algorithm: config.signature_algorithm,
        }
    }

    fn upload_url(&self) -> String {
        format!("{CLOUDINARY_API_BASE}/{}/image/upload", self.cloud_name)
    }

    /// Timestamp and signature for an upload made at `now`.
    fn signed_at(&self, folder: &str, now: DateTime<Utc>) -> (String, String) {
        let timestamp = now.timestamp();
        let signature = sign(
            folder,
            timestamp,
            self.api_secret.expose_secret(),
            self.algorithm,
        );
        (timestamp.to_string(), signature)
    }
}

/// Sign the upload parameters.
///
/// Parameters are sorted by name and joined as a query string, then the API
/// secret is appended before hashing.
fn sign(folder: &str, timestamp: i64, secret: &str, algorithm: SignatureAlgorithm) -> String {
    let payload = format!("folder={folder}&timestamp={timestamp}{secret}");
    match algorithm {
        SignatureAlgorithm::Sha1 => hex::encode(Sha1::digest(payload.as_bytes())),
        SignatureAlgorithm::Sha256 => hex::encode(Sha256::digest(payload.as_bytes())),
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    #[instrument(skip(self, source_url), fields(cloud = %self.cloud_name))]
    async fn upload(&self, source_url: &str, folder: &str) -> Result<String, UploadError> {
        let (timestamp, signature) = self.signed_at(folder, Utc::now());

        let form = [
            ("file", source_url),
            ("folder", folder),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature", signature.as_str()),
        ];

        let response = self
            .client
            .post(self.upload_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| UploadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map_or(body, |parsed| parsed.error.message);
            error!(status = %status, message = %message, "Cloudinary rejected upload");
            return Err(UploadError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Response(e.to_string()))?;

        debug!(url = %result.secure_url, "Image uploaded");
        Ok(result.secure_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const SECRET: &str = "abcdefghijklmnop";

    fn uploader(secret: &str) -> CloudinaryUploader {
        CloudinaryUploader {
            client: Client::new(),
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: SecretString::from(secret),
            algorithm: SignatureAlgorithm::Sha1,
        }
    }

    #[test]
    fn test_sha1_signature() {
        assert_eq!(
            sign("new_products", 1_700_000_000, SECRET, SignatureAlgorithm::Sha1),
            "58bebe02411c9009aee93475448d763b7bd3cb83"
        );
    }

    #[test]
    fn test_sha256_signature() {
        assert_eq!(
            sign("new_products", 1_700_000_000, SECRET, SignatureAlgorithm::Sha256),
            "9e11c68130cd4940ef7575c3ade7463af6f25e2dfd1328456310cdf2f9f5e2ed"
        );
    }

    #[test]
    fn test_upload_is_signed_with_unix_seconds() {
        let now = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        let (timestamp, signature) = uploader(SECRET).signed_at("new_products", now);

        assert_eq!(timestamp, "1700000000");
        assert_eq!(signature, "58bebe02411c9009aee93475448d763b7bd3cb83");
    }

    #[test]
    fn test_current_timestamp_is_recent() {
        let (timestamp, _) = uploader(SECRET).signed_at("new_products", Utc::now());
        assert!(timestamp.parse::<i64>().unwrap() > 1_700_000_000);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let uploader = uploader("super-secret-value");

        let debug = format!("{uploader:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-value"));
        assert_eq!(
            uploader.upload_url(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }
}
