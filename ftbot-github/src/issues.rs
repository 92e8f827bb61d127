//! Issue search and repository languages

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use ftbot_core::Issue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::parse_repository;
use crate::{Error, GitHubClient, Result};

/// A label search for recently created open issues
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Label to match exactly
    pub label: String,
    /// Only issues created on or after this day
    pub created_since: NaiveDate,
    /// Results per page
    pub per_page: u8,
}

impl SearchQuery {
    /// Render the GitHub search qualifier string
    pub fn to_query_string(&self) -> String {
        format!(
            "label:\"{}\" state:open type:issue created:>={}",
            self.label.replace('"', ""),
            self.created_since.format("%Y-%m-%d")
        )
    }
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    sort: &'static str,
    order: &'static str,
    per_page: u8,
    page: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<serde_json::Value>>,
}

/// The subset of a search result item we rely on
#[derive(Deserialize)]
struct SearchItem {
    id: u64,
    number: u64,
    title: String,
    url: String,
    repository_url: String,
    #[serde(default)]
    labels: Vec<SearchLabel>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct SearchLabel {
    name: String,
}

impl TryFrom<SearchItem> for Issue {
    type Error = Error;

    fn try_from(item: SearchItem) -> Result<Self> {
        Ok(Issue {
            id: item.id,
            number: item.number,
            title: item.title,
            api_url: item.url,
            repository: parse_repository(&item.repository_url)?,
            labels: item.labels.into_iter().map(|l| l.name).collect(),
            created_at: item.created_at,
            updated_at: item.updated_at,
            languages: Vec::new(),
        })
    }
}

/// Decode one search item; `None` (with a warning) when it is unusable
fn decode_item(value: serde_json::Value) -> Option<Issue> {
    let item: SearchItem = match serde_json::from_value(value) {
        Ok(item) => item,
        Err(e) => {
            warn!(error = %e, "Skipping malformed search result");
            return None;
        }
    };

    if item.pull_request.is_some() {
        debug!(id = item.id, "Skipping pull request in issue search");
        return None;
    }

    match Issue::try_from(item) {
        Ok(issue) => Some(issue),
        Err(e) => {
            warn!(error = %e, "Skipping search result with unexpected repository URL");
            None
        }
    }
}

/// Rank languages by bytes of code, most used first
fn rank_languages(bytes_by_language: HashMap<String, u64>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(String, u64)> = bytes_by_language.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(name, _)| name).collect()
}

impl GitHubClient {
    /// Fetch the first page of open issues matching `query`, most recently updated first
    pub async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>> {
        let q = query.to_query_string();
        debug!(query = %q, "Searching issues");

        let params = SearchParams {
            q: &q,
            sort: "updated",
            order: "desc",
            per_page: query.per_page,
            page: 1,
        };

        let response = self
            .client()
            .get::<SearchResponse, _, _>("/search/issues", Some(&params))
            .await
            .map_err(Error::from_octocrab)?;

        let Some(items) = response.items else {
            warn!(label = %query.label, "No 'items' in search response");
            return Ok(Vec::new());
        };

        let issues: Vec<Issue> = items.into_iter().filter_map(decode_item).collect();

        info!(label = %query.label, count = issues.len(), "Fetched issues");

        Ok(issues)
    }

    /// Top `limit` languages of `repository` (`owner/repo`)
    ///
    /// A repository that no longer exists has no languages rather than an error.
    pub async fn top_languages(&self, repository: &str, limit: usize) -> Result<Vec<String>> {
        let route = format!("/repos/{}/languages", repository);

        let bytes = match self
            .client()
            .get::<HashMap<String, u64>, _, _>(&route, None::<&()>)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => match Error::from_octocrab(e) {
                Error::NotFound(_) => {
                    warn!(repository, "Repository not found while fetching languages");
                    return Ok(Vec::new());
                }
                other => return Err(other),
            },
        };

        Ok(rank_languages(bytes, limit))
    }
}
