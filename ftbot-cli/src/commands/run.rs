//! Run, once and seed commands - drive the poll cycle

use std::time::Duration;

use anyhow::Context;
use clap::Args;
use ftbot_core::{Config, CycleReport, Notifier, PostMode, Secrets};
use ftbot_db::Database;
use ftbot_github::{GitHubClient, LabelSearch};
use ftbot_twitter::TwitterClient;
use tracing::{info, warn};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Compose posts and log them without posting or recording
    #[arg(long)]
    pub dry_run: bool,

    /// Time between poll cycles, e.g. `10m` (overrides config and env)
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Comma separated issue labels (overrides config and env)
    #[arg(short, long)]
    pub labels: Option<String>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let config = config.with_cli_overrides(self.labels.as_deref(), self.interval, None);
        config.validate()?;

        let notifier = build_notifier(&config, mode(self.dry_run)).await?;

        notifier.run(shutdown_signal()).await?;
        Ok(())
    }
}

/// Arguments for the once command
#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Compose posts and print them without posting or recording
    #[arg(long)]
    pub dry_run: bool,

    /// Comma separated issue labels (overrides config and env)
    #[arg(short, long)]
    pub labels: Option<String>,
}

impl OnceArgs {
    /// Execute the once command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let config = config.with_cli_overrides(self.labels.as_deref(), None, None);
        config.validate()?;

        let notifier = build_notifier(&config, mode(self.dry_run)).await?;
        let report = notifier.run_cycle().await?;

        print_report(notifier.mode(), &report);
        Ok(())
    }
}

/// Arguments for the seed command
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Comma separated issue labels (overrides config and env)
    #[arg(short, long)]
    pub labels: Option<String>,
}

impl SeedArgs {
    /// Execute the seed command
    ///
    /// Marks every fresh issue as posted so a first deployment does not
    /// flood the timeline with the backlog.
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let config = config.with_cli_overrides(self.labels.as_deref(), None, None);
        config.validate()?;

        let notifier = build_notifier(&config, PostMode::Seed).await?;
        let report = notifier.run_cycle().await?;

        print_report(PostMode::Seed, &report);
        Ok(())
    }
}

fn mode(dry_run: bool) -> PostMode {
    if dry_run {
        PostMode::DryRun
    } else {
        PostMode::Live
    }
}

/// Wire the GitHub source, the post store and (in live mode) the poster
///
/// Credentials are checked up front so a bad token fails here rather than
/// on the first post.
async fn build_notifier(config: &Config, mode: PostMode) -> anyhow::Result<Notifier> {
    let secrets = Secrets::load()?;

    let github = GitHubClient::new(secrets.github_token(), config.github.timeout)?;
    github.verify().await.context("GitHub token rejected")?;

    let db = Database::open(config.store.path.as_deref())
        .await
        .context("Failed to open post-record database")?;

    let source = LabelSearch::new(github, &config.github);
    let mut notifier =
        Notifier::new(config, Box::new(source), Box::new(db.post_records())).with_mode(mode);

    if mode == PostMode::Live {
        let token = secrets.twitter_access_token().context(
            "No Twitter access token. Set TWITTER_ACCESS_TOKEN or run `ftbot secrets init`",
        )?;
        let twitter = TwitterClient::new(&config.twitter, token)?;
        twitter.verify().await.context("Twitter token rejected")?;
        notifier = notifier.with_poster(Box::new(twitter));
    }

    info!(%mode, labels = ?config.github.labels, "Notifier ready");
    Ok(notifier)
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

fn print_report(mode: PostMode, report: &CycleReport) {
    println!("Poll cycle ({})", mode);
    println!("==============");
    println!("  fetched:        {}", report.fetched);
    println!("  stale:          {}", report.stale);
    println!("  already posted: {}", report.already_posted);
    match mode {
        PostMode::Live => println!("  posted:         {}", report.posted),
        PostMode::DryRun => println!("  previewed:      {}", report.previewed),
        PostMode::Seed => println!("  seeded:         {}", report.seeded),
    }
    println!("  skipped:        {}", report.skipped);
    println!("  failed:         {}", report.failed);
    if report.duplicates > 0 {
        println!("  duplicates:     {}", report.duplicates);
    }
    println!("  deferred:       {}", report.deferred);
    if report.pruned > 0 {
        println!("  pruned:         {}", report.pruned);
    }
}
