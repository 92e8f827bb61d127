//! Database layer for ftbot
//!
//! Remembers which issues have been posted so a restart never posts the same
//! issue twice.

pub mod error;
pub mod repos;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub use error::{Error, Result};
pub use repos::post_records::PostRecordsRepo;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `db_path` and migrate it
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create database directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
            .create_if_missing(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::migrated(pool).await
    }

    /// Create an in-memory database
    ///
    /// A single connection, since every SQLite memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("Database migrations applied");
        Ok(Self { pool })
    }

    /// Get the default database path (~/.local/share/ftbot/ftbot.db)
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| Error::Io("Could not determine data directory".to_string()))?;
        Ok(data_dir.join("ftbot").join("ftbot.db"))
    }

    /// Open the database at `path`, or at the default path when `None`
    pub async fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::new(path).await,
            None => Self::new(Self::default_path()?).await,
        }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the post records repository
    pub fn post_records(&self) -> PostRecordsRepo {
        PostRecordsRepo::new(self.pool.clone())
    }

    /// Close every connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}
