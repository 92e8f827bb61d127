//! GitHub API client using octocrab

use std::time::Duration;

use crate::{Error, Result};
use octocrab::Octocrab;
use tracing::{debug, info};

/// GitHub API client for issue search and repository metadata
pub struct GitHubClient {
    client: Octocrab,
    authenticated: bool,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// Without a token the client still works against the public search API,
    /// with GitHub's lower unauthenticated rate limits. Every request is
    /// bounded by `timeout`.
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self> {
        Self::build(None, token, timeout)
    }

    /// Create a client against a different API root, e.g. GitHub Enterprise
    pub fn with_base_uri(base_uri: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        Self::build(Some(base_uri), token, timeout)
    }

    fn build(base_uri: Option<&str>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let authenticated = token.is_some();

        let mut builder = Octocrab::builder()
            .set_connect_timeout(Some(timeout))
            .set_read_timeout(Some(timeout));

        if let Some(base_uri) = base_uri {
            builder = builder
                .base_uri(base_uri)
                .map_err(|e| Error::Parse(format!("Invalid GitHub base URI {}: {}", base_uri, e)))?;
        }

        if let Some(token) = token {
            builder = builder.personal_token(token);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        info!(authenticated, "Created GitHub client");

        Ok(Self {
            client,
            authenticated,
        })
    }

    /// Whether requests carry a token
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Get the underlying octocrab client
    pub fn client(&self) -> &Octocrab {
        &self.client
    }

    /// Check the token by fetching the authenticated user
    ///
    /// Does nothing for anonymous clients.
    pub async fn verify(&self) -> Result<()> {
        if !self.authenticated {
            debug!("No GitHub token configured, skipping verification");
            return Ok(());
        }

        let user = self
            .client
            .current()
            .user()
            .await
            .map_err(Error::from_octocrab)?;

        info!(login = %user.login, "GitHub token verified");
        Ok(())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

/// Parse a GitHub repository URL into `owner/repo`
///
/// Supports formats:
/// - owner/repo
/// - https://github.com/owner/repo
/// - https://api.github.com/repos/owner/repo
pub(crate) fn parse_repository(url: &str) -> Result<String> {
    if !url.contains("://") {
        let parts: Vec<&str> = url.split('/').collect();
        if let [owner, repo] = parts.as_slice() {
            if !owner.is_empty() && !repo.is_empty() {
                return Ok(format!("{}/{}", owner, repo.trim_end_matches(".git")));
            }
        }
        return Err(Error::Parse(format!(
            "Invalid repository format: {}. Expected owner/repo",
            url
        )));
    }

    let parsed = url::Url::parse(url).map_err(|e| Error::Parse(e.to_string()))?;
    let mut segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    // REST URLs carry a leading "repos" segment
    if segments.first() == Some(&"repos") {
        segments.remove(0);
    }

    match segments.as_slice() {
        [owner, repo, ..] => Ok(format!("{}/{}", owner, repo.trim_end_matches(".git"))),
        _ => Err(Error::Parse(format!("Invalid GitHub URL path: {}", parsed.path()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shorthand() {
        assert_eq!(parse_repository("owner/repo").unwrap(), "owner/repo");
    }

    #[test]
    fn test_parse_https_url() {
        assert_eq!(
            parse_repository("https://github.com/owner/repo.git").unwrap(),
            "owner/repo"
        );
    }

    #[test]
    fn test_parse_api_url() {
        assert_eq!(
            parse_repository("https://api.github.com/repos/owner/repo").unwrap(),
            "owner/repo"
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_repository("invalid").is_err());
        assert!(parse_repository("https://api.github.com/repos/owner").is_err());
    }
}
