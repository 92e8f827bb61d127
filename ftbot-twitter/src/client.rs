//! X/Twitter v2 API client using reqwest

use std::time::Duration;

use async_trait::async_trait;
use ftbot_core::{PostedMessage, Poster, TwitterConfig};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Epoch seconds at which the current rate-limit window resets
const RATE_LIMIT_RESET: &str = "x-rate-limit-reset";

/// Fragments of a 403 body that point at the token or app rather than the post
const ACCESS_PROBLEMS: [&str; 7] = [
    "auth",
    "permitted",
    "permission",
    "scope",
    "token",
    "suspended",
    "enrolled",
];

/// Client for the X/Twitter v2 API
///
/// Authenticates with an OAuth 2.0 user-context bearer token.
pub struct TwitterClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

#[derive(Serialize)]
struct CreatePost<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
    text: String,
}

#[derive(Deserialize)]
struct Me {
    username: String,
}

impl TwitterClient {
    /// Create a client; every request is bounded by `config.timeout`
    pub fn new(config: &TwitterConfig, access_token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ftbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Check the token by fetching the account it belongs to
    ///
    /// Returns the account's username.
    pub async fn verify(&self) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/2/users/me", self.api_base))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let me: Envelope<Me> = decode(check(response).await?).await?;
        info!(username = %me.data.username, "Authenticated with Twitter");
        Ok(me.data.username)
    }

    /// Publish a post
    pub async fn create_post(&self, text: &str) -> Result<PostedMessage> {
        debug!(chars = text.chars().count(), "Creating post");

        let response = self
            .http
            .post(format!("{}/2/tweets", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&CreatePost { text })
            .send()
            .await?;

        let created: Envelope<CreatedPost> = decode(check(response).await?).await?;

        Ok(PostedMessage {
            id: created.data.id,
            text: created.data.text,
        })
    }
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Poster for TwitterClient {
    async fn post(&self, text: &str) -> ftbot_core::Result<PostedMessage> {
        self.create_post(text).await.map_err(Into::into)
    }
}

/// Turn non-success responses into errors
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after(response.headers(), chrono::Utc::now().timestamp());
        return Err(Error::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Auth(body)),
        StatusCode::FORBIDDEN => Err(classify_forbidden(body)),
        _ => Err(Error::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

/// A 403 is fatal only when it is about access; otherwise it rejects one post
fn classify_forbidden(body: String) -> Error {
    let lower = body.to_lowercase();
    if lower.contains("duplicate") {
        Error::Duplicate(body)
    } else if ACCESS_PROBLEMS.iter().any(|p| lower.contains(p)) {
        Error::Auth(body)
    } else {
        Error::Status { status: 403, body }
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Parse(format!("{}: {}", e, body)))
}

/// Delay requested by a 429 response
///
/// `retry-after` (seconds) wins; otherwise the window reset time relative to
/// `now` (epoch seconds).
fn retry_after(headers: &HeaderMap, now: i64) -> Option<Duration> {
    let header = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    if let Some(secs) = header(RETRY_AFTER.as_str()) {
        return Some(Duration::from_secs(secs.max(0).unsigned_abs()));
    }

    header(RATE_LIMIT_RESET).map(|reset| Duration::from_secs((reset - now).max(0).unsigned_abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::header::HeaderValue;

    fn client(server: &mockito::Server) -> TwitterClient {
        let config = TwitterConfig {
            api_base: server.url(),
            timeout: Duration::from_secs(5),
            ..TwitterConfig::default()
        };
        TwitterClient::new(&config, "test-token").unwrap()
    }

    #[test]
    fn test_retry_after_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from_static("2000"));
        assert_eq!(retry_after(&headers, 1000), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_retry_after_from_reset() {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from_static("1060"));
        assert_eq!(retry_after(&headers, 1000), Some(Duration::from_secs(60)));

        // reset already passed
        assert_eq!(retry_after(&headers, 2000), Some(Duration::ZERO));

        assert_eq!(retry_after(&HeaderMap::new(), 1000), None);
    }

    #[tokio::test]
    async fn test_create_post() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2/tweets")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::Json(serde_json::json!({"text": "hello world"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"id": "1790000000000000000", "text": "hello world"}}"#)
            .create_async()
            .await;

        let posted = client(&server).create_post("hello world").await.unwrap();

        mock.assert_async().await;
        assert_eq!(posted.id, "1790000000000000000");
        assert_eq!(posted.text, "hello world");
    }

    #[tokio::test]
    async fn test_rate_limited_post() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(429)
            .with_header("retry-after", "12")
            .with_body(r#"{"title": "Too Many Requests"}"#)
            .create_async()
            .await;

        let err = client(&server).create_post("hi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(12)
        ));

        let core: ftbot_core::Error = err.into();
        assert!(core.is_transient());
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(401)
            .with_body(r#"{"title": "Unauthorized"}"#)
            .create_async()
            .await;

        let err: ftbot_core::Error = client(&server).post("hi").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_duplicate_content_is_reported_as_duplicate() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(403)
            .with_body(r#"{"detail": "You are not allowed to create a Tweet with duplicate content."}"#)
            .create_async()
            .await;

        let err: ftbot_core::Error = client(&server).post("hi").await.unwrap_err();
        assert!(matches!(err, ftbot_core::Error::Duplicate(_)));
        assert!(!err.is_fatal());
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_content_rejection_only_skips_the_post() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(403)
            .with_body(r#"{"title": "Forbidden", "detail": "This request looks like it might be automated."}"#)
            .create_async()
            .await;

        let err: ftbot_core::Error = client(&server).post("hi").await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_forbidden_for_missing_permission_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(403)
            .with_body(r#"{"title": "Forbidden", "detail": "You are not permitted to perform this action."}"#)
            .create_async()
            .await;

        let err: ftbot_core::Error = client(&server).post("hi").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_classify_forbidden() {
        assert!(matches!(
            classify_forbidden("Missing scope tweet.write".to_string()),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify_forbidden("Status is a duplicate.".to_string()),
            Error::Duplicate(_)
        ));
        assert!(matches!(
            classify_forbidden("Tweet text violates our rules".to_string()),
            Error::Status { status: 403, .. }
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(503)
            .with_body("over capacity")
            .create_async()
            .await;

        let err: ftbot_core::Error = client(&server).post("hi").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unexpected_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2/tweets")
            .with_status(201)
            .with_body(r#"{"errors": []}"#)
            .create_async()
            .await;

        let err = client(&server).create_post("hi").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_verify_returns_username() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2/users/me")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(r#"{"data": {"id": "1", "name": "First Timers", "username": "first_tmrs"}}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).verify().await.unwrap(), "first_tmrs");
    }
}
