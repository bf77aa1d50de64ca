//! Concrete adapters for picpost.
//!
//! - GitHub git-data client and an in-memory stand-in for the content repository
//! - In-memory TTL session store
//! - Slack notifier, attachment fetcher and inbound payload DTOs
//! - Configuration loading

pub mod config_service;
pub mod dto;
pub mod github_content_repository;
pub mod memory_content_repository;
pub mod memory_session_store;
pub mod slack_attachment_fetcher;
pub mod slack_notifier;

pub use crate::config_service::{ConfigService, Secrets};
pub use crate::github_content_repository::GitHubContentRepository;
pub use crate::memory_content_repository::InMemoryContentRepository;
pub use crate::memory_session_store::InMemorySessionStore;
pub use crate::slack_attachment_fetcher::SlackAttachmentFetcher;
pub use crate::slack_notifier::SlackNotifier;
