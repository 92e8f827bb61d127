//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded
    #[error("GitHub rate limit exceeded: {0}")]
    RateLimited(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Classify an octocrab error by what GitHub said
    pub(crate) fn from_octocrab(err: octocrab::Error) -> Self {
        if let octocrab::Error::GitHub { source, .. } = &err {
            let message = source.message.to_lowercase();
            if message.contains("rate limit") {
                return Error::RateLimited(source.message.clone());
            }
            if message.contains("bad credentials") {
                return Error::Auth("Invalid GitHub token".to_string());
            }
            if message.contains("not found") {
                return Error::NotFound(source.message.clone());
            }
        }

        if matches!(
            err,
            octocrab::Error::Serde { .. } | octocrab::Error::Json { .. }
        ) {
            return Error::Parse(err.to_string());
        }

        Error::Api(err)
    }
}

impl From<Error> for ftbot_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Api(e) => ftbot_core::Error::Network(format!("GitHub: {}", e)),
            Error::Auth(msg) => ftbot_core::Error::Auth(format!("GitHub: {}", msg)),
            Error::RateLimited(_) => ftbot_core::Error::RateLimited { retry_after: None },
            Error::NotFound(msg) | Error::Parse(msg) => {
                ftbot_core::Error::Malformed(format!("GitHub: {}", msg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_classification() {
        let auth: ftbot_core::Error = Error::Auth("Invalid GitHub token".to_string()).into();
        assert!(auth.is_fatal());

        let limited: ftbot_core::Error = Error::RateLimited("API rate limit exceeded".to_string()).into();
        assert!(limited.is_transient());

        let parse: ftbot_core::Error = Error::Parse("missing field".to_string()).into();
        assert!(matches!(parse, ftbot_core::Error::Malformed(_)));
    }
}
