//! Error types for ftbot

use std::time::Duration;

use thiserror::Error;

/// Result type alias for ftbot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ftbot operations
///
/// Service crates convert their own errors into this type at the seam so the
/// poll cycle can decide, per variant, whether to retry, skip or stop.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials missing or rejected by a remote API
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Remote API asked us to slow down
    #[error("Rate limited{}", .retry_after.map(|d| format!(", retry after {}s", d.as_secs())).unwrap_or_default())]
    RateLimited {
        /// Delay requested by the API, if it told us
        retry_after: Option<Duration>,
    },

    /// Transport failure, timeout or server-side error
    #[error("Network error: {0}")]
    Network(String),

    /// Remote API returned something we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The posting API already has this exact text
    #[error("Duplicate post: {0}")]
    Duplicate(String),

    /// Post-record store failure
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::RateLimited { .. })
    }

    /// Whether this error must stop the poll loop
    ///
    /// Authentication and configuration problems need an operator, and a
    /// broken store means we can no longer guarantee posting at most once.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Config(_) | Error::Store(_) | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::Network("reset".into()).is_transient());
        assert!(Error::RateLimited { retry_after: None }.is_transient());
        assert!(!Error::Auth("bad".into()).is_transient());
        assert!(!Error::Malformed("x".into()).is_transient());

        assert!(Error::Auth("bad".into()).is_fatal());
        assert!(Error::Store("locked".into()).is_fatal());
        assert!(!Error::Malformed("x".into()).is_fatal());
        assert!(!Error::Network("reset".into()).is_fatal());

        let duplicate = Error::Duplicate("already posted".into());
        assert!(!duplicate.is_fatal());
        assert!(!duplicate.is_transient());
    }

    #[test]
    fn test_rate_limited_display() {
        let err = Error::RateLimited {
            retry_after: Some(Duration::from_secs(15)),
        };
        assert_eq!(err.to_string(), "Rate limited, retry after 15s");
        assert_eq!(
            Error::RateLimited { retry_after: None }.to_string(),
            "Rate limited"
        );
    }
}
