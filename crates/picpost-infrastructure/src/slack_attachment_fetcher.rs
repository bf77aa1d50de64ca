//! Downloads Slack file uploads (`url_private`) with the bot token.

use async_trait::async_trait;
use picpost_core::content::AttachmentFetcher;
use picpost_core::error::{PicpostError, Result};
use reqwest::Client;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on a downloaded attachment.
pub const MAX_ATTACHMENT_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct SlackAttachmentFetcher {
    client: Client,
    token: String,
}

impl SlackAttachmentFetcher {
    pub fn new(token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            token: token.into(),
        }
    }
}

#[async_trait]
impl AttachmentFetcher for SlackAttachmentFetcher {
    async fn fetch(&self, source_ref: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(source_ref)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PicpostError::io(format!(
                "attachment download returned HTTP {status}"
            )));
        }

        // Slack answers an unauthorized private URL with its HTML login page.
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
        if is_html {
            return Err(PicpostError::io(
                "attachment download returned an HTML page (missing files:read scope?)",
            ));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(PicpostError::io(format!(
                "attachment is {} bytes, limit is {}",
                bytes.len(),
                MAX_ATTACHMENT_BYTES
            )));
        }
        tracing::debug!(bytes = bytes.len(), "[SlackAttachmentFetcher] downloaded attachment");
        Ok(bytes.to_vec())
    }
}
