//! Post records repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ftbot_core::{PostRecord, PostStore};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{Error, Result};

/// Row as stored; SQLite integers are signed
#[derive(sqlx::FromRow)]
struct PostRecordRow {
    issue_id: i64,
    issue_url: String,
    posted_at: DateTime<Utc>,
    post_id: Option<String>,
    text: String,
}

impl TryFrom<PostRecordRow> for PostRecord {
    type Error = Error;

    fn try_from(row: PostRecordRow) -> Result<Self> {
        Ok(PostRecord {
            issue_id: u64::try_from(row.issue_id)
                .map_err(|_| Error::InvalidData(format!("issue id {}", row.issue_id)))?,
            issue_url: row.issue_url,
            posted_at: row.posted_at,
            post_id: row.post_id,
            text: row.text,
        })
    }
}

fn to_db_id(issue_id: u64) -> Result<i64> {
    i64::try_from(issue_id).map_err(|_| Error::InvalidData(format!("issue id {}", issue_id)))
}

/// Repository for post records
///
/// Records are ordered by insertion, which is also posting order.
#[derive(Clone)]
pub struct PostRecordsRepo {
    pool: SqlitePool,
}

impl PostRecordsRepo {
    /// Create a new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record unless the issue already has one
    ///
    /// Returns whether a row was inserted.
    pub async fn insert(&self, record: &PostRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO post_records (issue_id, issue_url, posted_at, post_id, text)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_db_id(record.issue_id)?)
        .bind(&record.issue_url)
        .bind(record.posted_at)
        .bind(&record.post_id)
        .bind(&record.text)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            debug!(issue_id = record.issue_id, "Post record already exists");
        }
        Ok(inserted)
    }

    /// Whether `issue_id` has a record
    pub async fn contains(&self, issue_id: u64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM post_records WHERE issue_id = ?")
            .bind(to_db_id(issue_id)?)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// The `limit` most recent records, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, PostRecordRow>(
            r#"
            SELECT issue_id, issue_url, posted_at, post_id, text
            FROM post_records
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PostRecord::try_from).collect()
    }

    /// Number of records
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    /// Delete records posted before `posted_before`, except the `keep` most recent
    pub async fn delete_posted_before(
        &self,
        posted_before: DateTime<Utc>,
        keep: u32,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM post_records
            WHERE posted_at < ?
              AND id NOT IN (SELECT id FROM post_records ORDER BY id DESC LIMIT ?)
            "#,
        )
        .bind(posted_before)
        .bind(i64::from(keep))
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(deleted, keep, "Pruned old post records");
        }
        Ok(deleted)
    }
}

#[async_trait]
impl PostStore for PostRecordsRepo {
    async fn is_posted(&self, issue_id: u64) -> ftbot_core::Result<bool> {
        Ok(self.contains(issue_id).await?)
    }

    async fn record(&self, record: &PostRecord) -> ftbot_core::Result<()> {
        self.insert(record).await?;
        Ok(())
    }

    async fn last_posted(&self) -> ftbot_core::Result<Option<PostRecord>> {
        Ok(self.recent(1).await?.into_iter().next())
    }

    async fn prune(&self, keep: u32, posted_before: DateTime<Utc>) -> ftbot_core::Result<u64> {
        Ok(self.delete_posted_before(posted_before, keep).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use ftbot_core::PostedMessage;

    async fn repo() -> PostRecordsRepo {
        Database::in_memory().await.unwrap().post_records()
    }

    fn posted(issue_id: u64) -> PostRecord {
        PostRecord::posted(
            issue_id,
            format!("https://github.com/o/r/issues/{}", issue_id),
            PostedMessage {
                id: format!("tw-{}", issue_id),
                text: format!("Issue {}", issue_id),
            },
        )
    }

    #[tokio::test]
    async fn test_record_and_lookup() {
        let repo = repo().await;
        assert!(!repo.is_posted(101).await.unwrap());
        assert!(repo.last_posted().await.unwrap().is_none());

        repo.record(&posted(101)).await.unwrap();

        assert!(repo.is_posted(101).await.unwrap());
        assert!(!repo.is_posted(102).await.unwrap());

        let last = repo.last_posted().await.unwrap().unwrap();
        assert_eq!(last.issue_id, 101);
        assert_eq!(last.post_id.as_deref(), Some("tw-101"));
        assert_eq!(last.text, "Issue 101");
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let repo = repo().await;
        assert!(repo.insert(&posted(7)).await.unwrap());
        assert!(!repo.insert(&posted(7)).await.unwrap());

        repo.record(&PostRecord::seeded(7, "https://github.com/o/r/issues/7"))
            .await
            .unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        // the first record wins
        let kept = repo.recent(10).await.unwrap();
        assert!(!kept[0].is_seeded());
    }

    #[tokio::test]
    async fn test_seeded_records_round_trip() {
        let repo = repo().await;
        repo.record(&PostRecord::seeded(9, "https://github.com/o/r/issues/9"))
            .await
            .unwrap();

        let last = repo.last_posted().await.unwrap().unwrap();
        assert!(last.is_seeded());
        assert!(last.text.is_empty());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let repo = repo().await;
        for id in [3, 1, 2] {
            repo.record(&posted(id)).await.unwrap();
        }

        let ids: Vec<u64> = repo
            .recent(2)
            .await
            .unwrap()
            .iter()
            .map(|r| r.issue_id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    fn posted_days_ago(issue_id: u64, days: i64) -> PostRecord {
        let mut record = posted(issue_id);
        record.posted_at = Utc::now() - chrono::Duration::days(days);
        record
    }

    #[tokio::test]
    async fn test_prune_removes_only_old_records_beyond_retention() {
        let repo = repo().await;
        for id in 1..=3 {
            repo.record(&posted_days_ago(id, 30)).await.unwrap();
        }
        for id in 4..=5 {
            repo.record(&posted(id)).await.unwrap();
        }
        let cutoff = Utc::now() - chrono::Duration::days(15);

        assert_eq!(repo.prune(1, cutoff).await.unwrap(), 3);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(!repo.is_posted(1).await.unwrap());
        assert!(!repo.is_posted(3).await.unwrap());
        // recent records survive even past the retention floor
        assert!(repo.is_posted(4).await.unwrap());
        assert!(repo.is_posted(5).await.unwrap());

        assert_eq!(repo.prune(1, cutoff).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_keeps_retention_floor_of_old_records() {
        let repo = repo().await;
        for id in 1..=5 {
            repo.record(&posted_days_ago(id, 30)).await.unwrap();
        }
        let cutoff = Utc::now() - chrono::Duration::days(15);

        assert_eq!(repo.prune(3, cutoff).await.unwrap(), 2);
        assert!(!repo.is_posted(2).await.unwrap());
        assert!(repo.is_posted(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_issue_id_out_of_range() {
        let repo = repo().await;
        let err = repo.record(&posted(u64::MAX)).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
