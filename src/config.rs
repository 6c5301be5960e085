//! Application configuration module
//!
//! Settings come from an optional config file (JSON, TOML or YAML, chosen by
//! extension) overlaid with `GUVNAH__SECTION__KEY` environment variables.
//! A `.env` file is honoured if present.

use crate::source::{DEFAULT_LIAISON_SECTION, DEFAULT_LIAISON_URL, DEFAULT_PROJECTS_URL};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// IRC connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    pub nick: String,
    /// NickServ password; empty disables identification
    pub password: String,
    pub server: String,
    pub port: u16,
    /// Channels to join, as a list or a comma-separated string
    #[serde(deserialize_with = "string_or_list")]
    pub channels: Vec<String>,
    /// Defaults to TLS on port 6697 only
    pub tls: Option<bool>,
    /// Delay before reconnecting after the connection drops
    pub reconnect_secs: u64,
}

impl IrcConfig {
    pub fn use_tls(&self) -> bool {
        self.tls.unwrap_or(self.port == 6697)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_secs)
    }
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            nick: "guvnahbot".to_string(),
            password: String::new(),
            server: "irc.oftc.net".to_string(),
            port: 6697,
            channels: Vec::new(),
            tls: None,
            reconnect_secs: 60,
        }
    }
}

/// Document locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub projects_url: String,
    pub liaison_url: String,
    pub liaison_section: String,
    pub fetch_timeout_secs: u64,
}

impl SourceConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            projects_url: DEFAULT_PROJECTS_URL.to_string(),
            liaison_url: DEFAULT_LIAISON_URL.to_string(),
            liaison_section: DEFAULT_LIAISON_SECTION.to_string(),
            fetch_timeout_secs: 30,
        }
    }
}

/// Outgoing message pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    pub anti_flood_ms: u64,
    pub continuation_ms: u64,
    pub max_line_len: usize,
    pub max_chunks: usize,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            anti_flood_ms: 2000,
            continuation_ms: 500,
            max_line_len: 400,
            max_chunks: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Complete application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub irc: IrcConfig,
    pub sources: SourceConfig,
    pub flood: FloodConfig,
    /// 0 disables periodic refresh
    pub refresh_interval_secs: u64,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            irc: IrcConfig::default(),
            sources: SourceConfig::default(),
            flood: FloodConfig::default(),
            refresh_interval_secs: 0,
            log_filter: "info,guvnahbot=debug".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Load settings from the optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("GUVNAH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.irc.nick.trim().is_empty() {
            return Err(ConfigError::InvalidValue("irc.nick must not be empty".to_string()));
        }
        if self.irc.port == 0 {
            return Err(ConfigError::InvalidValue("irc.port must not be 0".to_string()));
        }
        if self.flood.max_line_len == 0 || self.flood.max_chunks == 0 {
            return Err(ConfigError::InvalidValue(
                "flood.max_line_len and flood.max_chunks must be positive".to_string(),
            ));
        }
        if self.sources.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "sources.fetch_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Channels {
        Joined(String),
        List(Vec<String>),
    }

    let channels = match Channels::deserialize(deserializer)? {
        Channels::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        Channels::List(list) => list,
    };
    Ok(channels
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect())
}
