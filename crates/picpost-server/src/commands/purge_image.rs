use anyhow::{Result, bail};
use picpost_application::AtomicCommitEngine;
use picpost_core::config::AppConfig;
use picpost_core::content::ContentRepository;
use picpost_infrastructure::Secrets;

use crate::bootstrap::content_repository;

/// Deletes `path` with a single-file commit.
///
/// Refuses when an entry still references the file, since the index is authoritative.
pub async fn run(config: &AppConfig, path: &str, message: Option<String>) -> Result<()> {
    config.validate()?;
    let secrets = Secrets::from_env();
    let content = content_repository(config, &secrets)?;

    let engine = AtomicCommitEngine::new(
        content.clone(),
        config.content.index_path.clone(),
        config.image_layout(),
        config.commit_identity(),
        config.commit.max_attempts,
    );
    let entries = engine.read_entries().await?;
    if let Some(entry) = entries.iter().find(|e| {
        engine.layout().repo_path_for_site_path(&e.image_path).as_deref() == Some(path)
    }) {
        bail!("{} is still referenced by entry #{}", path, entry.id);
    }

    let message = message.unwrap_or_else(|| format!("Remove orphaned image {path}"));
    content
        .delete_file(path, &message, &config.commit_identity())
        .await?;

    tracing::info!(path = %path, "[PurgeImage] removed");
    println!("Removed {path}");
    Ok(())
}
