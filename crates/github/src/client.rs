//! HTTP plumbing: request construction, status mapping, and retries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pipeline::{RetryPolicy, SourceError};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const PLACEHOLDER_TOKEN: &str = "ghp_PLACEHOLDER";
const BODY_EXCERPT_LEN: usize = 200;

/// Connection settings for [`crate::GithubCommitSource`].
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API root, e.g. `https://api.github.com` or a GitHub Enterprise `/api/v3` URL.
    pub api_url: String,
    /// Personal access token. `None` means anonymous access (60 requests/hour).
    pub token: Option<String>,
    /// Commits requested per page (GitHub caps this at 100).
    pub per_page: u8,
    /// Attempts after the first for retryable failures.
    pub max_retries: u32,
    /// Longest single wait the adapter accepts before giving up on a rate limit.
    pub max_wait: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            per_page: 100,
            max_retries: 3,
            max_wait: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GithubConfig {
    /// Sets the token, discarding empty values and the template placeholder.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = usable_token(token);
        self
    }
}

fn usable_token(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && t != PLACEHOLDER_TOKEN)
}

// ---------------------------------------------------------------------------
// Rate-limit headers
// ---------------------------------------------------------------------------

/// The rate-limit related headers of one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RateLimitHeaders {
    pub remaining: Option<u64>,
    /// Epoch seconds at which the window resets.
    pub reset: Option<i64>,
    /// Seconds to wait, from `retry-after`.
    pub retry_after: Option<u64>,
}

impl RateLimitHeaders {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        fn parse<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers.get(name)?.to_str().ok()?.trim().parse().ok()
        }
        Self {
            remaining: parse(headers, "x-ratelimit-remaining"),
            reset: parse(headers, "x-ratelimit-reset"),
            retry_after: parse(headers, "retry-after"),
        }
    }
}

/// Maps a non-success response to a [`SourceError`].
///
/// 403 and 429 count as rate limiting only when the headers say so; GitHub also
/// answers 403 for plain permission problems.
pub(crate) fn error_for_status(
    status: u16,
    rate: &RateLimitHeaders,
    now_epoch: i64,
    body: &str,
) -> SourceError {
    let limited = rate.remaining == Some(0) || rate.retry_after.is_some();
    match status {
        403 | 429 if limited => {
            let reset_after = rate
                .retry_after
                .map(Duration::from_secs)
                .or_else(|| {
                    rate.reset
                        .map(|reset| Duration::from_secs((reset - now_epoch).max(0) as u64))
                });
            SourceError::RateLimited { reset_after }
        }
        401 => SourceError::Unauthorized {
            message: excerpt(body),
        },
        _ => SourceError::UnexpectedResponse {
            status,
            message: excerpt(body),
        },
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500u64.saturating_mul(1 << attempt.min(6)))
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// The JSON fetching the source and its streams depend on.
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError>;

    async fn get_value(&self, url: &Url, query: &[(&str, String)]) -> Result<Value, SourceError>;
}

/// Decodes an already fetched body into `T`.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, SourceError> {
    serde_json::from_value(value).map_err(|e| SourceError::UnexpectedResponse {
        status: StatusCode::OK.as_u16(),
        message: format!("undecodable body: {e}"),
    })
}

/// Builds `{base}/{segments...}`, percent-encoding each segment.
pub(crate) fn join_endpoint(base: &Url, segments: &[&str]) -> Result<Url, SourceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| SourceError::Transport {
            message: format!("API URL '{base}' cannot carry a path"),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Thin JSON client shared by the source and its streams.
pub(crate) struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
    max_retries: u32,
    max_wait: Duration,
}

impl ApiClient {
    pub(crate) fn new(config: &GithubConfig) -> Result<Self, SourceError> {
        let base = Url::parse(&config.api_url).map_err(|e| SourceError::Transport {
            message: format!("invalid API URL '{}': {e}", config.api_url),
        })?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("commit-ingest/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base,
            token: usable_token(config.token.clone()),
            max_retries: config.max_retries,
            max_wait: config.max_wait,
        })
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// GETs `url` and decodes the JSON body, retrying per [`SourceError::retry_policy`].
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let mut attempt = 0;
        loop {
            let err = match self.get_once(url, query).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let wait = match err.retry_policy() {
                RetryPolicy::Retryable { after } if attempt < self.max_retries => {
                    after.unwrap_or_else(|| backoff(attempt))
                }
                _ => return Err(err),
            };
            if wait > self.max_wait {
                warn!(
                    url = %url,
                    wait_secs = wait.as_secs(),
                    "Retry wait exceeds limit; giving up"
                );
                return Err(err);
            }
            attempt += 1;
            warn!(
                url = %url,
                attempt,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "Retrying GitHub request"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let mut request = self
            .http
            .get(url.clone())
            .query(query)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!(url = %url, "GET");
        let response = request.send().await.map_err(|e| SourceError::Transport {
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| SourceError::UnexpectedResponse {
                    status: status.as_u16(),
                    message: format!("undecodable body: {e}"),
                });
        }

        let rate = RateLimitHeaders::from_headers(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(
            status.as_u16(),
            &rate,
            Utc::now().timestamp(),
            &body,
        ))
    }
}

#[async_trait]
impl Transport for ApiClient {
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        join_endpoint(&self.base, segments)
    }

    async fn get_value(&self, url: &Url, query: &[(&str, String)]) -> Result<Value, SourceError> {
        self.get_json(url, query).await
    }
}

/// `true` for a 404 response.
pub(crate) fn is_not_found(err: &SourceError) -> bool {
    matches!(
        err,
        SourceError::UnexpectedResponse { status, .. }
            if *status == StatusCode::NOT_FOUND.as_u16()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn placeholder_and_blank_tokens_are_discarded() {
        assert_eq!(usable_token(Some("ghp_PLACEHOLDER".into())), None);
        assert_eq!(usable_token(Some("   ".into())), None);
        assert_eq!(usable_token(None), None);
        assert_eq!(usable_token(Some(" ghp_abc ".into())), Some("ghp_abc".into()));
    }

    #[test]
    fn rate_limit_headers_are_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000060"));
        let rate = RateLimitHeaders::from_headers(&headers);
        assert_eq!(rate.remaining, Some(0));
        assert_eq!(rate.reset, Some(1_700_000_060));
        assert_eq!(rate.retry_after, None);
    }

    #[test]
    fn exhausted_quota_maps_to_rate_limited_with_reset() {
        let rate = RateLimitHeaders {
            remaining: Some(0),
            reset: Some(1_700_000_060),
            retry_after: None,
        };
        let err = error_for_status(403, &rate, 1_700_000_000, "API rate limit exceeded");
        assert!(matches!(
            err,
            SourceError::RateLimited { reset_after: Some(d) } if d == Duration::from_secs(60)
        ));
    }

    #[test]
    fn retry_after_wins_over_reset() {
        let rate = RateLimitHeaders {
            remaining: Some(10),
            reset: Some(1_700_000_600),
            retry_after: Some(5),
        };
        let err = error_for_status(429, &rate, 1_700_000_000, "");
        assert!(matches!(
            err,
            SourceError::RateLimited { reset_after: Some(d) } if d == Duration::from_secs(5)
        ));
    }

    #[test]
    fn plain_forbidden_is_not_a_rate_limit() {
        let rate = RateLimitHeaders {
            remaining: Some(4999),
            ..RateLimitHeaders::default()
        };
        let err = error_for_status(403, &rate, 0, "Resource not accessible");
        assert!(matches!(err, SourceError::UnexpectedResponse { status: 403, .. }));
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn unauthorized_and_not_found_are_mapped() {
        let rate = RateLimitHeaders::default();
        assert!(matches!(
            error_for_status(401, &rate, 0, "Bad credentials"),
            SourceError::Unauthorized { .. }
        ));
        assert!(is_not_found(&error_for_status(404, &rate, 0, "Not Found")));
        assert!(!is_not_found(&error_for_status(500, &rate, 0, "")));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let message = excerpt(&body);
        assert_eq!(message.chars().count(), BODY_EXCERPT_LEN + 1);
    }

    #[test]
    fn endpoint_encodes_segments_and_keeps_base_path() {
        let config = GithubConfig {
            api_url: "https://ghe.example.com/api/v3".into(),
            ..GithubConfig::default()
        };
        let client = ApiClient::new(&config).unwrap();
        let url = client
            .endpoint(&["repos", "octocat", "Hello-World", "branches", "release/1.x"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octocat/Hello-World/branches/release%2F1.x"
        );
    }

    #[test]
    fn decode_failures_are_unexpected_responses() {
        let err = decode::<Vec<String>>(serde_json::json!({ "message": "oops" })).unwrap_err();
        assert!(matches!(err, SourceError::UnexpectedResponse { status: 200, .. }));
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        assert_eq!(backoff(0), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_millis(2000));
        assert_eq!(backoff(20), backoff(6));
    }
}
