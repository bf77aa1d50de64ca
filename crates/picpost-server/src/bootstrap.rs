use std::sync::Arc;

use anyhow::{Context, Result};
use picpost_application::{AtomicCommitEngine, EventIntake, FlowController};
use picpost_core::clock::{Clock, SystemClock};
use picpost_core::config::AppConfig;
use picpost_core::content::ContentRepository;
use picpost_infrastructure::{
    GitHubContentRepository, InMemoryContentRepository, InMemorySessionStore, Secrets,
    SlackAttachmentFetcher, SlackNotifier,
};

/// Everything `serve` needs, wired together.
pub struct AppBootstrap {
    pub intake: Arc<EventIntake>,
    /// Kept to purge expired records in the background
    pub sessions: Arc<InMemorySessionStore>,
}

impl AppBootstrap {
    pub fn build(config: &AppConfig, secrets: &Secrets, dry_run: bool) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let content: Arc<dyn ContentRepository> = if dry_run {
            tracing::warn!("[Bootstrap] dry run: commits stay in memory");
            Arc::new(InMemoryContentRepository::new())
        } else {
            tracing::info!(
                "[Bootstrap] Content repository: {}/{}@{}",
                config.content.owner,
                config.content.repo,
                config.content.branch
            );
            content_repository(config, secrets)?
        };

        let slack_token = secrets.require_slack_bot_token()?;
        let notifier = Arc::new(SlackNotifier::new(slack_token));
        let fetcher = Arc::new(SlackAttachmentFetcher::new(slack_token));
        let sessions = Arc::new(InMemorySessionStore::new(clock.clone()));

        let engine = Arc::new(AtomicCommitEngine::new(
            content,
            config.content.index_path.clone(),
            config.image_layout(),
            config.commit_identity(),
            config.commit.max_attempts,
        ));
        let flow = Arc::new(FlowController::new(
            sessions.clone(),
            engine,
            fetcher,
            notifier,
            clock,
            config.session_ttl(),
        ));
        let intake = Arc::new(EventIntake::new(flow, config.dedup.capacity));

        tracing::info!(
            index = %config.content.index_path,
            dedup_capacity = config.dedup.capacity,
            "[Bootstrap] Application initialized"
        );
        Ok(Self { intake, sessions })
    }
}

/// The GitHub-backed content repository for `config`.
pub fn content_repository(
    config: &AppConfig,
    secrets: &Secrets,
) -> Result<Arc<dyn ContentRepository>> {
    let token = secrets.require_github_token()?;
    let repo = GitHubContentRepository::new(&config.content, token)
        .context("Failed to create GitHub client")?;
    Ok(Arc::new(repo))
}
