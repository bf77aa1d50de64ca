//! Attachment download contract.

use crate::error::Result;
use async_trait::async_trait;

/// Downloads the bytes behind an attachment's `source_ref`.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, source_ref: &str) -> Result<Vec<u8>>;
}
