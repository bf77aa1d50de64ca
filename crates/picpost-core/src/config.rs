//! Application configuration model.
//!
//! Every field has a default so a missing or partial `config.toml` still loads. Secrets
//! (API tokens) are never part of this model; they come from the environment.

use crate::content::CommitIdentity;
use crate::entry::ImageLayout;
use crate::error::{PicpostError, Result};
use crate::session::SessionTtl;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub content: ContentConfig,
    pub commit: CommitConfig,
    pub session: SessionConfig,
    pub dedup: DedupConfig,
    pub server: ServerConfig,
}

/// Where the content repository lives and how it is laid out.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ContentConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Path of the JSON index file
    pub index_path: String,
    /// Repository directory holding `YYYY/MM/<file>` images
    pub image_base_path: String,
    /// Prefix of `Entry.imagePath`
    pub site_image_prefix: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            index_path: "data/entries.json".to_string(),
            image_base_path: "images".to_string(),
            site_image_prefix: String::new(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CommitConfig {
    pub author_name: String,
    pub author_email: String,
    /// Attempts per change when the branch moved underneath us
    pub max_attempts: u32,
}

impl Default for CommitConfig {
    fn default() -> Self {
        let identity = CommitIdentity::default();
        Self {
            author_name: identity.name,
            author_email: identity.email,
            max_attempts: 3,
        }
    }
}

/// Upper bound for either session TTL (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub active_ttl_secs: u64,
    pub completed_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let ttl = SessionTtl::default();
        Self {
            active_ttl_secs: ttl.active.as_secs(),
            completed_ttl_secs: ttl.retained.as_secs(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DedupConfig {
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn image_layout(&self) -> ImageLayout {
        ImageLayout::new(
            self.content.image_base_path.clone(),
            self.content.site_image_prefix.clone(),
        )
    }

    pub fn commit_identity(&self) -> CommitIdentity {
        CommitIdentity {
            name: self.commit.author_name.clone(),
            email: self.commit.author_email.clone(),
        }
    }

    pub fn session_ttl(&self) -> SessionTtl {
        SessionTtl {
            active: Duration::from_secs(self.session.active_ttl_secs),
            retained: Duration::from_secs(self.session.completed_ttl_secs),
        }
    }

    /// Rejects configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.content.owner.trim().is_empty() || self.content.repo.trim().is_empty() {
            return Err(PicpostError::config("content.owner and content.repo must be set"));
        }
        if self.content.branch.trim().is_empty() {
            return Err(PicpostError::config("content.branch must not be empty"));
        }
        if self.content.index_path.trim().is_empty() {
            return Err(PicpostError::config("content.index_path must not be empty"));
        }
        if self.commit.max_attempts == 0 {
            return Err(PicpostError::config("commit.max_attempts must be at least 1"));
        }
        if self.dedup.capacity == 0 {
            return Err(PicpostError::config("dedup.capacity must be at least 1"));
        }
        if self.session.active_ttl_secs == 0 || self.session.completed_ttl_secs == 0 {
            return Err(PicpostError::config("session TTLs must be positive"));
        }
        if self.session.active_ttl_secs > MAX_SESSION_TTL_SECS
            || self.session.completed_ttl_secs > MAX_SESSION_TTL_SECS
        {
            return Err(PicpostError::config(format!(
                "session TTLs must not exceed {MAX_SESSION_TTL_SECS} seconds"
            )));
        }
        Ok(())
    }
}
