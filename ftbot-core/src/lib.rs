//! ftbot Core - Core library for the first-timers issue notifier
//!
//! This crate holds the pieces shared by every ftbot component: the error
//! classification, configuration and secrets, the issue/post model, post
//! formatting, retry policy, and the poll cycle that ties an issue source,
//! a poster and a post-record store together.

pub mod config;
pub mod error;
pub mod format;
pub mod issue;
pub mod notifier;
pub mod retry;
pub mod secrets;

pub use config::{
    Config, GitHubConfig, LoggingConfig, PollConfig, StoreConfig, TwitterConfig,
};
pub use error::{Error, Result};
pub use format::{humanize_url, PostFormatter};
pub use issue::{Issue, PostRecord, PostedMessage};
pub use notifier::{CycleReport, IssueSource, Notifier, PostMode, PostStore, Poster};
pub use retry::RetryPolicy;
pub use secrets::Secrets;
