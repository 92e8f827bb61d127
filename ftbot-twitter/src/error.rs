//! Error types for posting operations

use std::time::Duration;

use thiserror::Error;

/// Result type for posting operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the posting API
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token missing, expired or lacking scopes
    #[error("Twitter authentication error: {0}")]
    Auth(String),

    /// Too many requests
    #[error("Twitter rate limit exceeded")]
    RateLimited {
        /// How long the API asked us to wait
        retry_after: Option<Duration>,
    },

    /// The same text is already on the timeline
    #[error("Twitter rejected duplicate content: {0}")]
    Duplicate(String),

    /// Non-success status that is neither auth nor rate limiting
    #[error("Twitter API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for the logs
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("Unexpected Twitter response: {0}")]
    Parse(String),
}

impl From<Error> for ftbot_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Http(e) => ftbot_core::Error::Network(format!("Twitter: {}", e)),
            Error::Auth(msg) => ftbot_core::Error::Auth(format!("Twitter: {}", msg)),
            Error::RateLimited { retry_after } => ftbot_core::Error::RateLimited { retry_after },
            Error::Duplicate(msg) => ftbot_core::Error::Duplicate(msg),
            Error::Status { status, body } if status >= 500 => {
                ftbot_core::Error::Network(format!("Twitter returned {}: {}", status, body))
            }
            Error::Status { status, body } => {
                ftbot_core::Error::Malformed(format!("Twitter returned {}: {}", status, body))
            }
            Error::Parse(msg) => ftbot_core::Error::Malformed(format!("Twitter: {}", msg)),
        }
    }
}
