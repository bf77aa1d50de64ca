//! Configuration loading.
//!
//! The configuration is read from `~/.config/picpost/config.toml` (or an explicit path),
//! then selected fields are overridden from `PICPOST_*` environment variables. Secrets are
//! only ever read from the environment.

use picpost_core::config::AppConfig;
use picpost_core::error::{PicpostError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_GITHUB_TOKEN: &str = "PICPOST_GITHUB_TOKEN";
pub const ENV_SLACK_BOT_TOKEN: &str = "PICPOST_SLACK_BOT_TOKEN";

/// API tokens needed to talk to the external platforms.
#[derive(Clone)]
pub struct Secrets {
    pub github_token: Option<String>,
    pub slack_bot_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            github_token: non_empty(ENV_GITHUB_TOKEN),
            slack_bot_token: non_empty(ENV_SLACK_BOT_TOKEN),
        }
    }

    pub fn require_github_token(&self) -> Result<&str> {
        self.github_token
            .as_deref()
            .ok_or_else(|| PicpostError::config(format!("{ENV_GITHUB_TOKEN} is not set")))
    }

    pub fn require_slack_bot_token(&self) -> Result<&str> {
        self.slack_bot_token
            .as_deref()
            .ok_or_else(|| PicpostError::config(format!("{ENV_SLACK_BOT_TOKEN} is not set")))
    }
}

// Tokens must never reach the logs.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("github_token", &self.github_token.as_ref().map(|_| "***"))
            .field("slack_bot_token", &self.slack_bot_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Loads [`AppConfig`] from disk and the environment.
pub struct ConfigService;

impl ConfigService {
    /// Default location: `<config_dir>/picpost/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("picpost").join("config.toml"))
    }

    /// Loads the configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is used if present,
    /// otherwise built-in defaults apply. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_config_path() {
                Some(default_path) if default_path.exists() => Self::load_file(&default_path)?,
                _ => {
                    tracing::info!("[ConfigService] no config file found, using defaults");
                    AppConfig::default()
                }
            },
        };
        Ok(Self::apply_overrides(config, |key| env::var(key).ok()))
    }

    /// Reads one TOML file. An empty file yields the defaults.
    pub fn load_file(path: &Path) -> Result<AppConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            PicpostError::config(format!("Failed to read config file at {:?}: {}", path, e))
        })?;

        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }

        let config: AppConfig = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "[ConfigService] loaded config");
        Ok(config)
    }

    fn apply_overrides(mut config: AppConfig, lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
        let overrides: [(&str, &mut String); 5] = [
            ("PICPOST_GITHUB_API_BASE", &mut config.content.api_base),
            ("PICPOST_GITHUB_OWNER", &mut config.content.owner),
            ("PICPOST_GITHUB_REPO", &mut config.content.repo),
            ("PICPOST_GITHUB_BRANCH", &mut config.content.branch),
            ("PICPOST_BIND_ADDR", &mut config.server.bind_addr),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[content]
owner = "acme"
repo = "site"
index_path = "src/data/photos.json"

[session]
active_ttl_secs = 600
"#
        )
        .unwrap();

        let config = ConfigService::load_file(file.path()).unwrap();
        assert_eq!(config.content.owner, "acme");
        assert_eq!(config.content.index_path, "src/data/photos.json");
        assert_eq!(config.session.active_ttl_secs, 600);
        assert_eq!(config.session.completed_ttl_secs, 604800);
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = ConfigService::load_file(file.path()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = ConfigService::load(Some(Path::new("/nonexistent/picpost.toml"))).unwrap_err();
        assert!(matches!(err, PicpostError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[content\nowner = ").unwrap();
        let err = ConfigService::load_file(file.path()).unwrap_err();
        assert!(matches!(err, PicpostError::Serialization { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PICPOST_GITHUB_OWNER", "other"),
            ("PICPOST_GITHUB_BRANCH", "gh-pages"),
            ("PICPOST_GITHUB_REPO", "  "),
        ]);
        let mut config = AppConfig::default();
        config.content.repo = "site".to_string();

        let config =
            ConfigService::apply_overrides(config, |key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.content.owner, "other");
        assert_eq!(config.content.branch, "gh-pages");
        assert_eq!(config.content.repo, "site");
    }

    #[test]
    fn test_secrets_are_redacted() {
        let secrets = Secrets::from_lookup(|key| match key {
            ENV_GITHUB_TOKEN => Some("ghp_secret".to_string()),
            _ => None,
        });
        assert_eq!(secrets.require_github_token().unwrap(), "ghp_secret");
        assert!(secrets.require_slack_bot_token().is_err());
        assert!(!format!("{secrets:?}").contains("ghp_secret"));
    }
}
