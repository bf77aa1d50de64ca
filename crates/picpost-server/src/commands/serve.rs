use std::time::Duration;

use anyhow::{Context, Result};
use picpost_core::config::AppConfig;
use picpost_infrastructure::Secrets;
use tokio::net::TcpListener;

use crate::bootstrap::AppBootstrap;
use crate::http;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

pub async fn run(config: AppConfig, dry_run: bool) -> Result<()> {
    config.validate()?;
    let secrets = Secrets::from_env();
    let app = AppBootstrap::build(&config, &secrets, dry_run)?;

    let sessions = app.sessions.clone();
    let purge = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "[Serve] purged expired sessions");
            }
        }
    });

    let router = http::router(app.intake.clone());
    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    tracing::info!("[Serve] listening on {}", config.server.bind_addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    purge.abort();
    tracing::info!("[Serve] stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[Serve] failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[Serve] shutdown requested");
}
