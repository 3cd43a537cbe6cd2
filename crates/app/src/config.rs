use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(
        "no access token configured; set `access_token` in einzug.toml or the EINZUG_TOKEN env var"
    )]
    MissingToken,
}

/// `einzug.toml` in the platform config directory. Everything is optional;
/// the token may instead come from the environment.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    pub access_token: Option<String>,
    pub budget_id: Option<String>,
    pub account_id: Option<String>,
    pub base_url: Option<String>,
    /// Path to a dialect snapshot overriding the bundled one.
    pub dialects: Option<PathBuf>,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "einzug", "einzug")
            .map(|dirs| dirs.config_dir().join("einzug.toml"))
    }

    /// Load the config file if it exists, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => toml::from_str(&std::fs::read_to_string(path)?)?,
            _ => Config::default(),
        };
        if let Ok(token) = std::env::var("EINZUG_TOKEN") {
            if !token.trim().is_empty() {
                config.access_token = Some(token);
            }
        }
        Ok(config)
    }

    /// The credential check that must pass before any request is attempted.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)
    }
}
