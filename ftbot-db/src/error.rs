//! Error types for database operations

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// A value that does not fit the schema
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for ftbot_core::Error {
    fn from(err: Error) -> Self {
        ftbot_core::Error::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_store_error_is_fatal() {
        let err: ftbot_core::Error = Error::InvalidData("issue id -1".into()).into();
        assert!(err.is_fatal());

        let err: ftbot_core::Error = Error::Sqlx(sqlx::Error::PoolClosed).into();
        assert!(err.is_fatal());
    }
}
