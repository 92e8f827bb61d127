//! Secrets management for ftbot
//!
//! Secrets are stored separately from configuration to avoid accidental sharing.
//! The secrets file is located at `~/.config/ftbot/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (GITHUB_TOKEN, TWITTER_ACCESS_TOKEN)
//! 2. Secrets file (~/.config/ftbot/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// GitHub configuration
    pub github: GitHubSecrets,

    /// X/Twitter configuration
    pub twitter: TwitterSecrets,
}

/// GitHub-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    /// GitHub Personal Access Token (optional, raises search rate limits)
    pub token: Option<String>,
}

/// X/Twitter-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TwitterSecrets {
    /// OAuth 2.0 user-context access token with the `tweet.write` scope
    pub access_token: Option<String>,
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_secrets_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }

            debug!(path = %path.display(), mode = format!("{:o}", mode & 0o777), "Secrets file permissions OK");
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        for token in [
            &mut secrets.github.token,
            &mut secrets.twitter.access_token,
        ]
        .into_iter()
        .flatten()
        {
            *token = token.trim().to_string();
        }

        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/ftbot/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ftbot").join("secrets.toml"))
    }

    /// Get GitHub token with environment variable override
    ///
    /// Priority: GITHUB_TOKEN env var > secrets file
    pub fn github_token(&self) -> Option<String> {
        pick_token(
            "GITHUB_TOKEN",
            std::env::var("GITHUB_TOKEN").ok(),
            self.github.token.as_deref(),
        )
    }

    /// Get the posting access token with environment variable override
    ///
    /// Priority: TWITTER_ACCESS_TOKEN env var > secrets file
    pub fn twitter_access_token(&self) -> Option<String> {
        pick_token(
            "TWITTER_ACCESS_TOKEN",
            std::env::var("TWITTER_ACCESS_TOKEN").ok(),
            self.twitter.access_token.as_deref(),
        )
    }

    /// Create a template secrets file at the default location
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    /// Create a template secrets file at `path`
    ///
    /// Creates parent directories if needed and sets secure permissions
    pub fn create_template_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        // Don't overwrite existing file
        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        let template = r#"# ftbot Secrets
# This file contains sensitive credentials - do not share or commit to version control
#
# IMPORTANT: This file must have restrictive permissions (chmod 600)

[github]
# GitHub Personal Access Token (optional, raises search rate limits)
# Create at: https://github.com/settings/tokens
token = ""

[twitter]
# OAuth 2.0 user-context access token with tweet.read, tweet.write and users.read scopes
access_token = ""
"#;

        std::fs::write(path, template).map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, perms).map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template - please edit and add your tokens");

        Ok(())
    }
}

fn pick_token(var: &str, from_env: Option<String>, from_file: Option<&str>) -> Option<String> {
    if let Some(token) = from_env {
        let token = token.trim().to_string();
        if !token.is_empty() {
            debug!(var, "Using token from environment variable");
            return Some(token);
        }
    }

    match from_file {
        Some(token) if !token.is_empty() => {
            debug!(var, "Using token from secrets file");
            Some(token.to_string())
        }
        _ => None,
    }
}
