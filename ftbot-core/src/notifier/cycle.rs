//! One poll cycle and the interval loop around it

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::{IssueSource, PostStore, Poster};
use crate::{humanize_url, Config, Error, Issue, PostFormatter, PostRecord, Result, RetryPolicy};

/// What a cycle does with new issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostMode {
    /// Post and record
    #[default]
    Live,
    /// Compose and log, touch neither the poster nor the store
    DryRun,
    /// Record as posted without posting
    Seed,
}

impl fmt::Display for PostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostMode::Live => write!(f, "live"),
            PostMode::DryRun => write!(f, "dry-run"),
            PostMode::Seed => write!(f, "seed"),
        }
    }
}

/// Counters for one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Issues returned by the source, duplicates included
    pub fetched: usize,
    /// Issues older than the freshness window
    pub stale: usize,
    /// Issues that already had a post record
    pub already_posted: usize,
    /// Issues posted this cycle
    pub posted: usize,
    /// Issues that would have been posted (dry run)
    pub previewed: usize,
    /// Issues recorded without posting (seed)
    pub seeded: usize,
    /// Issues skipped because GitHub returned something unusable
    pub skipped: usize,
    /// Issues whose post failed after retries
    pub failed: usize,
    /// Issues the posting API rejected as already posted, recorded as handled
    pub duplicates: usize,
    /// Issues left for the next cycle by the per-cycle cap or a long rate limit
    pub deferred: usize,
    /// Records removed by retention pruning
    pub pruned: u64,
}

enum Outcome {
    Posted,
    Previewed,
    Seeded,
}

/// Drives poll cycles over an issue source, a poster and a post store
pub struct Notifier {
    source: Box<dyn IssueSource>,
    poster: Option<Box<dyn Poster>>,
    store: Box<dyn PostStore>,
    formatter: PostFormatter,
    retry: RetryPolicy,
    mode: PostMode,
    fetch_languages: bool,
    max_age_days: u32,
    max_posts_per_cycle: usize,
    post_delay: Duration,
    retention: u32,
    interval: Duration,
}

impl Notifier {
    /// Create a notifier from configuration
    ///
    /// A poster must be attached with [`Notifier::with_poster`] before a
    /// live cycle can run.
    pub fn new(
        config: &Config,
        source: Box<dyn IssueSource>,
        store: Box<dyn PostStore>,
    ) -> Self {
        Self {
            source,
            poster: None,
            store,
            formatter: PostFormatter::new(
                &config.twitter.hashtags,
                config.twitter.max_language_tags,
            ),
            retry: RetryPolicy::from(&config.poll),
            mode: PostMode::Live,
            fetch_languages: config.twitter.max_language_tags > 0,
            max_age_days: config.github.max_age_days,
            max_posts_per_cycle: config.poll.max_posts_per_cycle,
            post_delay: config.poll.post_delay,
            retention: config.store.retention,
            interval: config.poll.interval,
        }
    }

    /// Attach the poster used in live mode
    pub fn with_poster(mut self, poster: Box<dyn Poster>) -> Self {
        self.poster = Some(poster);
        self
    }

    /// Set the post mode
    pub fn with_mode(mut self, mode: PostMode) -> Self {
        self.mode = mode;
        self
    }

    /// Current post mode
    pub fn mode(&self) -> PostMode {
        self.mode
    }

    /// Run one poll cycle
    ///
    /// Errors that affect a single issue are counted in the report; only
    /// fatal errors (see [`Error::is_fatal`]) and a failed fetch are returned.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        if self.mode == PostMode::Live && self.poster.is_none() {
            return Err(Error::Config(
                "Live mode requires a configured poster".to_string(),
            ));
        }

        let mut report = CycleReport::default();

        if let Some(last) = self.store.last_posted().await? {
            debug!(
                issue_id = last.issue_id,
                posted_at = %last.posted_at,
                "Last recorded post"
            );
        }

        let issues = self.source.fetch_issues().await?;
        report.fetched = issues.len();
        info!(count = issues.len(), mode = %self.mode, "Fetched candidate issues");

        let now = Utc::now();
        let mut seen = HashSet::new();
        let mut rate_limited = false;

        for mut issue in issues {
            if !seen.insert(issue.id) {
                continue;
            }
            if !issue.is_fresh(now, self.max_age_days) {
                report.stale += 1;
                continue;
            }
            if self.store.is_posted(issue.id).await? {
                debug!(issue_id = issue.id, "Already posted, skipping");
                report.already_posted += 1;
                continue;
            }
            if self.mode != PostMode::Seed
                && (rate_limited || report.posted + report.previewed >= self.max_posts_per_cycle)
            {
                report.deferred += 1;
                continue;
            }

            if report.posted > 0 && self.mode == PostMode::Live {
                sleep(self.post_delay).await;
            }

            match self.handle(&mut issue).await {
                Ok(Outcome::Posted) => report.posted += 1,
                Ok(Outcome::Previewed) => report.previewed += 1,
                Ok(Outcome::Seeded) => report.seeded += 1,
                Err(e) if e.is_fatal() => {
                    error!(issue_id = issue.id, error = %e, "Fatal error, stopping cycle");
                    return Err(e);
                }
                Err(e @ Error::Malformed(_)) => {
                    warn!(issue_id = issue.id, error = %e, "Skipping malformed issue");
                    report.skipped += 1;
                }
                Err(Error::Duplicate(msg)) => {
                    warn!(
                        issue_id = issue.id,
                        reason = %msg,
                        "Already on the timeline, recording as handled"
                    );
                    self.store
                        .record(&PostRecord::seeded(issue.id, humanize_url(&issue.api_url)?))
                        .await?;
                    report.duplicates += 1;
                }
                Err(e @ Error::RateLimited { .. }) => {
                    // the limit is per account, so every later post would hit it too
                    warn!(issue_id = issue.id, error = %e, "Rate limited, deferring remaining posts");
                    rate_limited = true;
                    report.deferred += 1;
                }
                Err(e) => {
                    error!(
                        issue_id = issue.id,
                        title = %issue.title,
                        error = %e,
                        "Failed to post issue"
                    );
                    report.failed += 1;
                }
            }
        }

        if self.mode != PostMode::DryRun {
            // created_at <= posted_at, so anything posted before the freshness
            // window belongs to an issue that can no longer be fresh
            let posted_before = now - chrono::Duration::days(i64::from(self.max_age_days));
            report.pruned = self.store.prune(self.retention, posted_before).await?;
        }

        info!(
            posted = report.posted,
            previewed = report.previewed,
            seeded = report.seeded,
            already_posted = report.already_posted,
            failed = report.failed,
            duplicates = report.duplicates,
            skipped = report.skipped,
            deferred = report.deferred,
            "Poll cycle complete"
        );

        Ok(report)
    }

    async fn handle(&self, issue: &mut Issue) -> Result<Outcome> {
        let issue_url = humanize_url(&issue.api_url)?;

        if self.mode == PostMode::Seed {
            self.store
                .record(&PostRecord::seeded(issue.id, issue_url))
                .await?;
            return Ok(Outcome::Seeded);
        }

        if self.fetch_languages && issue.languages.is_empty() {
            match self.source.languages(&issue.repository).await {
                Ok(languages) => issue.languages = languages,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(
                    repository = %issue.repository,
                    error = %e,
                    "Could not fetch repository languages, posting without them"
                ),
            }
        }

        let text = self.formatter.compose(issue)?;

        let poster = match (self.mode, self.poster.as_deref()) {
            (PostMode::Live, Some(poster)) => poster,
            _ => {
                info!(issue_id = issue.id, text = %text, "[dry run] Would post");
                return Ok(Outcome::Previewed);
            }
        };

        let text = text.as_str();
        let message = self.retry.execute(move || poster.post(text)).await?;
        info!(issue_id = issue.id, post_id = %message.id, "Posted issue");

        self.store
            .record(&PostRecord::posted(issue.id, issue_url, message))
            .await?;

        Ok(Outcome::Posted)
    }

    /// Run poll cycles every `poll.interval` until `shutdown` resolves
    ///
    /// A cycle in progress is allowed to finish; shutdown is observed between
    /// cycles and during the interval sleep. Non-fatal cycle errors are logged
    /// and the loop carries on.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval_secs = self.interval.as_secs(), mode = %self.mode, "Starting poll loop");

        loop {
            match self.run_cycle().await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Stopping poll loop");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "Poll cycle failed, retrying next interval"),
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving poll loop");
                    return Ok(());
                }
                _ = sleep(self.interval) => {}
            }
        }
    }
}
