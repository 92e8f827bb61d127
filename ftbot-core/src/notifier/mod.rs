//! Poll cycle: fetch issues, post the new ones, remember what was posted
//!
//! The cycle talks to the outside world only through the three traits below,
//! implemented by `ftbot-github`, `ftbot-twitter` and `ftbot-db`.

mod cycle;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Issue, PostRecord, PostedMessage, Result};

pub use cycle::{CycleReport, Notifier, PostMode};

/// Where candidate issues come from
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fetch candidate issues, most recently updated first
    async fn fetch_issues(&self) -> Result<Vec<Issue>>;

    /// Top languages of `repository` (`owner/repo`), most used first
    async fn languages(&self, _repository: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Where posts go
#[async_trait]
pub trait Poster: Send + Sync {
    /// Publish `text`
    async fn post(&self, text: &str) -> Result<PostedMessage>;
}

/// Persisted record of what has been posted
///
/// Implementations must make `record` idempotent per issue id: recording an
/// issue twice never yields two records.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Whether `issue_id` already has a post record
    async fn is_posted(&self, issue_id: u64) -> Result<bool>;

    /// Persist a post record
    async fn record(&self, record: &PostRecord) -> Result<()>;

    /// Most recent post record, if any
    async fn last_posted(&self) -> Result<Option<PostRecord>>;

    /// Delete records posted before `posted_before`, returning how many went
    ///
    /// The `keep` most recent records stay regardless of age. Callers pass a
    /// cutoff no later than the oldest creation time a fresh issue can have,
    /// so a deleted record can never match an issue that is still postable.
    async fn prune(&self, keep: u32, posted_before: DateTime<Utc>) -> Result<u64>;
}
