//! Issue and post-record model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An issue fetched from GitHub
///
/// Read-only from ftbot's point of view; `languages` is the only field filled
/// in after fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// GitHub's global issue id
    pub id: u64,
    /// Issue number within its repository
    pub number: u64,
    /// Issue title
    pub title: String,
    /// REST API URL, `https://api.github.com/repos/{owner}/{repo}/issues/{n}`
    pub api_url: String,
    /// Repository in `owner/repo` form
    pub repository: String,
    /// Labels attached to the issue
    #[serde(default)]
    pub labels: Vec<String>,
    /// When the issue was created
    pub created_at: DateTime<Utc>,
    /// When the issue was last updated
    pub updated_at: DateTime<Utc>,
    /// Top repository languages, most used first
    #[serde(default)]
    pub languages: Vec<String>,
}

impl Issue {
    /// Whether the issue was created less than `max_age_days` days before `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age_days: u32) -> bool {
        now - self.created_at < Duration::days(i64::from(max_age_days))
    }
}

/// What the posting API returned for a successful post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    /// Id assigned by the posting API
    pub id: String,
    /// Text as accepted
    pub text: String,
}

/// A record that an issue has been posted
///
/// Created once, on successful post, and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// GitHub's global issue id
    pub issue_id: u64,
    /// Human-facing issue URL
    pub issue_url: String,
    /// When the post was made (or the issue was seeded)
    pub posted_at: DateTime<Utc>,
    /// Post id from the posting API; `None` for seeded records
    pub post_id: Option<String>,
    /// Text that was posted; empty for seeded records
    pub text: String,
}

impl PostRecord {
    /// Record a successful post
    pub fn posted(issue_id: u64, issue_url: impl Into<String>, message: PostedMessage) -> Self {
        Self {
            issue_id,
            issue_url: issue_url.into(),
            posted_at: Utc::now(),
            post_id: Some(message.id),
            text: message.text,
        }
    }

    /// Record an issue as handled without posting it
    pub fn seeded(issue_id: u64, issue_url: impl Into<String>) -> Self {
        Self {
            issue_id,
            issue_url: issue_url.into(),
            posted_at: Utc::now(),
            post_id: None,
            text: String::new(),
        }
    }

    /// Whether this record came from seeding rather than a real post
    pub fn is_seeded(&self) -> bool {
        self.post_id.is_none()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build an issue in `owner/repo` created `age_days` ago
    pub fn issue(id: u64, title: &str, age_days: i64) -> Issue {
        let created_at = Utc::now() - Duration::days(age_days);
        Issue {
            id,
            number: id,
            title: title.to_string(),
            api_url: format!("https://api.github.com/repos/owner/repo/issues/{}", id),
            repository: "owner/repo".to_string(),
            labels: vec!["good first issue".to_string()],
            created_at,
            updated_at: created_at,
            languages: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::issue;
    use super::*;

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();
        assert!(issue(1, "new", 0).is_fresh(now, 15));
        assert!(issue(2, "two weeks", 14).is_fresh(now, 15));
        assert!(!issue(3, "old", 15).is_fresh(now, 15));
        assert!(!issue(4, "ancient", 400).is_fresh(now, 15));
    }

    #[test]
    fn test_post_record_constructors() {
        let posted = PostRecord::posted(
            7,
            "https://github.com/owner/repo/issues/7",
            PostedMessage {
                id: "1790".to_string(),
                text: "hello".to_string(),
            },
        );
        assert!(!posted.is_seeded());
        assert_eq!(posted.post_id.as_deref(), Some("1790"));
        assert_eq!(posted.text, "hello");

        let seeded = PostRecord::seeded(8, "https://github.com/owner/repo/issues/8");
        assert!(seeded.is_seeded());
        assert!(seeded.text.is_empty());
    }
}
