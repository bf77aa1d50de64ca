use anyhow::Result;
use clap::{Parser, Subcommand};
use picpost_infrastructure::ConfigService;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod commands;
mod http;

#[derive(Parser)]
#[command(name = "picpost")]
#[command(about = "picpost - post images from chat threads into a content repository", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to <config dir>/picpost/config.toml)
    #[arg(long, global = true, env = "PICPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chat event endpoints
    Serve {
        /// Keep content in memory instead of committing to the remote repository
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete one file (usually an orphaned image) from the content repository
    PurgeImage {
        /// Repository path of the file
        path: String,
        /// Commit message
        #[arg(long)]
        message: Option<String>,
    },
    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ConfigService::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { dry_run } => commands::serve::run(config, dry_run).await?,
        Commands::PurgeImage { path, message } => {
            commands::purge_image::run(&config, &path, message).await?
        }
        Commands::CheckConfig => commands::check_config::run(&config)?,
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `info`.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
