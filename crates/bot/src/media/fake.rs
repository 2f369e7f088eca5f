//! Uploader that never leaves the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{MediaUploader, UploadError};

/// Returns deterministic URLs under `https://media.invalid/`.
///
/// Used by tests and by the CLI's in-memory mode.
#[derive(Debug, Clone, Default)]
pub struct FakeUploader {
    uploads: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl FakeUploader {
    /// Create an uploader that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following upload fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of successful uploads.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaUploader for FakeUploader {
    async fn upload(&self, _source_url: &str, folder: &str) -> Result<String, UploadError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(UploadError::Api {
                status: 500,
                message: "upload rejected".to_string(),
            });
        }

        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("https://media.invalid/{folder}/{n}.jpg"))
    }
}
