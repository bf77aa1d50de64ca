use anyhow::Result;
use picpost_core::config::AppConfig;
use picpost_infrastructure::Secrets;
use picpost_infrastructure::config_service::{ENV_GITHUB_TOKEN, ENV_SLACK_BOT_TOKEN};

pub fn run(config: &AppConfig) -> Result<()> {
    config.validate()?;
    let secrets = Secrets::from_env();

    println!("{}", serde_json::to_string_pretty(config)?);
    println!("{secrets:?}");
    if secrets.github_token.is_none() {
        println!("warning: {ENV_GITHUB_TOKEN} is not set; only `serve --dry-run` can start");
    }
    if secrets.slack_bot_token.is_none() {
        println!("warning: {ENV_SLACK_BOT_TOKEN} is not set; `serve` cannot start");
    }
    println!("Configuration OK");
    Ok(())
}
