//! ftbot GitHub - issue source backed by the GitHub REST API
//!
//! Searches for open issues carrying beginner-friendly labels and looks up
//! repository languages for hashtags.

mod client;
mod error;
mod issues;
mod source;

pub use client::GitHubClient;
pub use error::{Error, Result};
pub use issues::SearchQuery;
pub use source::LabelSearch;
