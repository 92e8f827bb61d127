//! Label search as an [`IssueSource`]

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ftbot_core::{GitHubConfig, Issue, IssueSource};
use tracing::warn;

use crate::{Error, GitHubClient, SearchQuery};

/// Languages looked up per repository; the formatter uses the first few
const LANGUAGE_LIMIT: usize = 3;

/// Issue source searching every configured label
#[derive(Debug)]
pub struct LabelSearch {
    client: GitHubClient,
    labels: Vec<String>,
    per_page: u8,
    max_age_days: u32,
}

impl LabelSearch {
    /// Create a source from the GitHub section of the configuration
    pub fn new(client: GitHubClient, config: &GitHubConfig) -> Self {
        Self {
            client,
            labels: config.labels.clone(),
            per_page: config.per_page,
            max_age_days: config.max_age_days,
        }
    }

    fn queries(&self) -> Vec<SearchQuery> {
        let created_since =
            (Utc::now() - Duration::days(i64::from(self.max_age_days))).date_naive();
        self.labels
            .iter()
            .map(|label| SearchQuery {
                label: label.clone(),
                created_since,
                per_page: self.per_page,
            })
            .collect()
    }
}

/// Merge per-label results, keeping the first occurrence of each issue,
/// most recently updated first
fn merge(batches: Vec<Vec<Issue>>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Issue> = batches
        .into_iter()
        .flatten()
        .filter(|issue| seen.insert(issue.id))
        .collect();
    merged.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    merged
}

#[async_trait]
impl IssueSource for LabelSearch {
    /// Search each label in turn
    ///
    /// A label whose search fails is skipped; the fetch only fails when no
    /// label could be searched, or on bad credentials.
    async fn fetch_issues(&self) -> ftbot_core::Result<Vec<Issue>> {
        let mut batches = Vec::new();
        let mut last_error = None;

        for query in self.queries() {
            match self.client.search_issues(&query).await {
                Ok(issues) => batches.push(issues),
                Err(Error::Auth(msg)) => return Err(Error::Auth(msg).into()),
                Err(e) => {
                    warn!(label = %query.label, error = %e, "Label search failed");
                    last_error = Some(e);
                }
            }
        }

        if batches.is_empty() {
            if let Some(e) = last_error {
                return Err(e.into());
            }
        }

        Ok(merge(batches))
    }

    async fn languages(&self, repository: &str) -> ftbot_core::Result<Vec<String>> {
        self.client
            .top_languages(repository, LANGUAGE_LIMIT)
            .await
            .map_err(Into::into)
    }
}
