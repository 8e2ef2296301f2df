//! Client for GitHub's repository search endpoint.

use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use futures::future::{BoxFuture, FutureExt};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::clock::SharedClock;
use crate::config::GitHubConfig;
use crate::errors::{GatewayError, RateLimitError};
use crate::models::{RateLimitSnapshot, Repository, SearchRequest, SortField, SortOrder};


pub const SEARCH_PATH: &str = "/search/repositories";

/// What one upstream search returned, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct GitHubSearchResponse {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub items: Option<Vec<Repository>>,
    pub rate_limit: RateLimitSnapshot,
}

/// The upstream seam. `RepositoryService` only talks to GitHub through this.
pub trait RepositorySearch: Send + Sync {
    fn search_repositories<'a>(
        &'a self,
        request: &'a SearchRequest,
    ) -> BoxFuture<'a, Result<GitHubSearchResponse, GatewayError>>;
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    incomplete_results: bool,
    #[serde(default)]
    items: Option<Vec<Repository>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

enum FetchFailure {
    Status {
        status: StatusCode,
        headers: HeaderMap,
        message: String,
    },
    Transport(reqwest::Error),
}

impl FetchFailure {
    fn should_retry(&self) -> bool {
        match self {
            // GitHub signals secondary rate limits with 403
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::FORBIDDEN
            }
            Self::Transport(_) => true,
        }
    }

    fn into_gateway_error(self, now: DateTime<Utc>) -> GatewayError {
        match self {
            Self::Status {
                status,
                headers,
                message,
            } => match status {
                StatusCode::FORBIDDEN => {
                    let snapshot = RateLimitSnapshot::from_headers(&headers);
                    if headers.contains_key("x-ratelimit-remaining") && snapshot.remaining == 0 {
                        let reset_time = snapshot
                            .reset_at()
                            .unwrap_or_else(|| now + ChronoDuration::hours(1));
                        GatewayError::RateLimited(RateLimitError::GitHub { reset_time })
                    } else {
                        GatewayError::Forbidden("GitHub API access forbidden".to_string())
                    }
                }
                StatusCode::UNPROCESSABLE_ENTITY => {
                    GatewayError::BadRequest(format!("GitHub API validation failed: {}", message))
                }
                StatusCode::NOT_FOUND => {
                    GatewayError::NotFound("GitHub API endpoint not found".to_string())
                }
                _ => GatewayError::Upstream(message),
            },
            Self::Transport(e) if e.is_timeout() => {
                error!("GitHub API request timed out: {}", e);
                GatewayError::Timeout
            }
            Self::Transport(e) => {
                error!("GitHub API request failed: {}", e);
                GatewayError::Unavailable("Failed to communicate with GitHub API".to_string())
            }
        }
    }
}

pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
    clock: SharedClock,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig, clock: SharedClock) -> Result<Self, GatewayError> {
        if config.token.is_none() {
            warn!("No GitHub token configured - using unauthenticated requests");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(default_headers(&config)?)
            .build()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(Self {
            http,
            config,
            clock,
        })
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<GitHubSearchResponse, GatewayError> {
        let params = search_params(request, self.clock.now().date_naive());
        info!("Searching repositories with params: {:?}", params);

        let (headers, body) = self.get_with_retry(SEARCH_PATH, &params).await?;
        let body: SearchBody = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Upstream(format!("invalid search response: {}", e)))?;

        let rate_limit = RateLimitSnapshot::from_headers(&headers);
        self.warn_if_low(&rate_limit);
        info!("GitHub API returned {} total repositories", body.total_count);

        Ok(GitHubSearchResponse {
            total_count: body.total_count,
            incomplete_results: body.incomplete_results,
            items: body.items,
            rate_limit,
        })
    }

    async fn get_with_retry(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<(HeaderMap, Bytes), GatewayError> {
        let mut attempt = 0;
        loop {
            match self.get(path, params).await {
                Ok(ok) => return Ok(ok),
                Err(failure) if attempt < self.config.max_retries && failure.should_retry() => {
                    let delay = self.config.retry_base_delay_ms.saturating_mul(1 << attempt.min(16));
                    attempt += 1;
                    warn!(
                        "Request failed, retrying in {}ms (attempt {}/{})",
                        delay, attempt, self.config.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(failure) => return Err(failure.into_gateway_error(self.clock.now())),
            }
        }
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<(HeaderMap, Bytes), FetchFailure> {
        let url = format!("{}{}", self.config.api_url, path);
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(FetchFailure::Transport)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(FetchFailure::Transport)?;

        if status.is_success() {
            return Ok((headers, body));
        }

        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| "GitHub API error".to_string());
        Err(FetchFailure::Status {
            status,
            headers,
            message,
        })
    }

    fn warn_if_low(&self, rate_limit: &RateLimitSnapshot) {
        if rate_limit.remaining <= self.config.rate_limit_buffer {
            warn!(
                "GitHub rate limit approaching. Remaining: {}, Reset: {}",
                rate_limit.remaining,
                rate_limit
                    .reset_at()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string())
            );
        }
    }
}

impl RepositorySearch for GitHubClient {
    fn search_repositories<'a>(
        &'a self,
        request: &'a SearchRequest,
    ) -> BoxFuture<'a, Result<GitHubSearchResponse, GatewayError>> {
        self.search(request).boxed()
    }
}

fn default_headers(config: &GitHubConfig) -> Result<HeaderMap, GatewayError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::ACCEPT,
        HeaderValue::from_static("application/vnd.github.v3+json"),
    );
    let user_agent = format!("repo-ranker/{}", env!("CARGO_PKG_VERSION"));
    headers.insert(
        http::header::USER_AGENT,
        HeaderValue::from_str(&user_agent).map_err(|e| GatewayError::Internal(e.to_string()))?,
    );
    if let Some(token) = &config.token {
        let mut value = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|_| GatewayError::Internal("GitHub token is not a valid header".to_string()))?;
        value.set_sensitive(true);
        headers.insert(http::header::AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Query-string parameters for `/search/repositories`. Relative `created`
/// ranges are resolved against `today`.
pub fn search_params(request: &SearchRequest, today: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("q", build_query(request, today)),
        (
            "sort",
            request.sort.unwrap_or(SortField::Stars).as_str().to_string(),
        ),
        (
            "order",
            request.order.unwrap_or(SortOrder::Desc).as_str().to_string(),
        ),
        ("per_page", request.effective_per_page().to_string()),
        ("page", request.effective_page().to_string()),
    ]
}

/// The search text with `language:` and `created:` qualifiers appended
/// when the caller passed them separately and `q` does not already have
/// them.
pub fn build_query(request: &SearchRequest, today: NaiveDate) -> String {
    let mut query = request.q.trim().to_string();

    if let Some(language) = request.language.as_deref().map(str::trim) {
        if !language.is_empty() && !query.contains("language:") {
            query.push_str(&format!(" language:{}", language));
        }
    }
    if let Some(created) = request.created.as_deref().map(str::trim) {
        if !created.is_empty() && !query.contains("created:") {
            let created = date_range_qualifier(created, today).unwrap_or_else(|| created.to_string());
            query.push_str(&format!(" created:{}", created));
        }
    }
    query
}

/// Expands `today`, `week`, `month` and `year` into `>=YYYY-MM-DD`.
pub fn date_range_qualifier(range: &str, today: NaiveDate) -> Option<String> {
    let start = match range {
        "today" => today,
        "week" => today - ChronoDuration::days(7),
        "month" => today.checked_sub_months(chrono::Months::new(1))?,
        "year" => today.checked_sub_months(chrono::Months::new(12))?,
        _ => return None,
    };
    Some(format!(">={}", start.format("%Y-%m-%d")))
}
