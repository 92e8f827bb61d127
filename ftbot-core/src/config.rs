//! Configuration management for ftbot
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (FTBOT_*)
//! 3. Config file (~/.config/ftbot/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// GitHub issue search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Labels to search for; an issue matching any of them is a candidate
    pub labels: Vec<String>,

    /// Search results per label and poll
    pub per_page: u8,

    /// Ignore issues created more than this many days ago
    pub max_age_days: u32,

    /// Bound on each GitHub request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            labels: vec![
                "good first issue".to_string(),
                "good-first-issue".to_string(),
                "beginner-friendly".to_string(),
            ],
            per_page: 30,
            max_age_days: 15,
            timeout: Duration::from_secs(30),
        }
    }
}

/// X/Twitter posting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TwitterConfig {
    /// API base URL
    pub api_base: String,

    /// Hashtags appended to every post, without the leading `#`
    pub hashtags: Vec<String>,

    /// How many repository languages become hashtags
    pub max_language_tags: usize,

    /// Bound on each posting request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com".to_string(),
            hashtags: vec!["github".to_string(), "opensource".to_string()],
            max_language_tags: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Poll loop, pacing and retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Time between poll cycles
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Pause between two posts in the same cycle
    #[serde(with = "humantime_serde")]
    pub post_delay: Duration,

    /// Posts beyond this count wait for the next cycle
    pub max_posts_per_cycle: usize,

    /// Retries per post after the first attempt
    pub max_retries: u32,

    /// First backoff delay, doubled on each retry
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    /// Upper bound for any single wait, including server-requested ones
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600),
            post_delay: Duration::from_secs(1),
            max_posts_per_cycle: 10,
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
        }
    }
}

/// Post-record store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file; defaults to `~/.local/share/ftbot/ftbot.db`
    pub path: Option<PathBuf>,

    /// Minimum number of post records kept by pruning
    pub retention: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for a daily-rotated log file, in addition to stderr
    pub file: Option<PathBuf>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration
    pub github: GitHubConfig,

    /// X/Twitter configuration
    pub twitter: TwitterConfig,

    /// Poll loop configuration
    pub poll: PollConfig,

    /// Store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/ftbot/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ftbot").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - FTBOT_LABELS: comma separated label list
    /// - FTBOT_POLL_INTERVAL: humantime duration, e.g. `15m`
    /// - FTBOT_DB_PATH: post-record store location
    /// - FTBOT_TWITTER_API_BASE: posting API base URL
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(labels) = std::env::var("FTBOT_LABELS") {
            self.github.labels = split_labels(&labels);
        }

        if let Ok(interval) = std::env::var("FTBOT_POLL_INTERVAL") {
            self.poll.interval = humantime::parse_duration(&interval).map_err(|e| {
                Error::Config(format!("Invalid FTBOT_POLL_INTERVAL '{}': {}", interval, e))
            })?;
        }

        if let Ok(path) = std::env::var("FTBOT_DB_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        if let Ok(api_base) = std::env::var("FTBOT_TWITTER_API_BASE") {
            self.twitter.api_base = api_base;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        labels: Option<&str>,
        interval: Option<Duration>,
        db_path: Option<PathBuf>,
    ) -> Self {
        if let Some(labels) = labels {
            self.github.labels = split_labels(labels);
        }

        if let Some(interval) = interval {
            self.poll.interval = interval;
        }

        if let Some(path) = db_path {
            self.store.path = Some(path);
        }

        self
    }

    /// Load configuration with file and environment overrides applied
    ///
    /// `path` replaces the default config location when given; a missing
    /// explicit file is an error, a missing default file is not.
    pub fn load_with_overrides(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.github.labels.is_empty() {
            return Err(Error::Config("At least one issue label is required".to_string()));
        }
        if self.github.per_page == 0 || self.github.per_page > 100 {
            return Err(Error::Config(format!(
                "github.per_page must be between 1 and 100, got {}",
                self.github.per_page
            )));
        }
        if self.poll.interval.is_zero() {
            return Err(Error::Config("poll.interval must be positive".to_string()));
        }
        if self.poll.max_backoff < self.poll.initial_backoff {
            return Err(Error::Config(
                "poll.max_backoff must be >= poll.initial_backoff".to_string(),
            ));
        }
        if self.store.retention == 0 {
            return Err(Error::Config("store.retention must be positive".to_string()));
        }
        url::Url::parse(&self.twitter.api_base).map_err(|e| {
            Error::Config(format!(
                "Invalid twitter.api_base '{}': {}",
                self.twitter.api_base, e
            ))
        })?;
        Ok(())
    }
}

/// Split a comma separated label list, dropping blanks
fn split_labels(labels: &str) -> Vec<String> {
    labels
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
