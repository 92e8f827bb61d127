//! ftbot Twitter - publishes posts through the X/Twitter v2 API

mod client;
mod error;

pub use client::TwitterClient;
pub use error::{Error, Result};
