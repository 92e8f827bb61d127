//! Status command - show what has been posted

use clap::Args;
use ftbot_core::{Config, PostRecord};
use ftbot_db::Database;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of records to show
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: u32,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let db = Database::open(config.store.path.as_deref()).await?;
        let repo = db.post_records();

        let total = repo.count().await?;
        let records = repo.recent(self.limit).await?;

        println!("Post records: {} (keeping {})", total, config.store.retention);
        println!();

        if records.is_empty() {
            println!("Nothing posted yet");
            return Ok(());
        }

        for record in &records {
            println!("{}", format_record(record));
        }

        Ok(())
    }
}

fn format_record(record: &PostRecord) -> String {
    let post = match &record.post_id {
        Some(id) => format!("post {}", id),
        None => "seeded".to_string(),
    };
    format!(
        "{}  {:<24}  {}",
        record.posted_at.format("%Y-%m-%d %H:%M"),
        post,
        record.issue_url
    )
}
