use chrono::{DateTime, TimeZone, Utc};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::TtlCache;
use crate::clock::SharedClock;
use crate::config::Config;
use crate::errors::GatewayError;
use crate::rate_limit::RateLimiter;

/// A repository as returned by GitHub search. Only the fields used for
/// ranking are typed; everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stargazers_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchers_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_issues_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Repository {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub popularity: f64,
    pub activity: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRepository {
    #[serde(flatten)]
    pub repository: Repository,
    pub popularity_score: f64,
    pub score_breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortField {
    Stars,
    Forks,
    HelpWantedIssues,
    Updated,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stars => "stars",
            Self::Forks => "forks",
            Self::HelpWantedIssues => "help-wanted-issues",
            Self::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;

/// Query parameters of `GET /api/repositories/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
    pub language: Option<String>,
    pub created: Option<String>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl SearchRequest {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Self::default()
        }
    }

    /// Trims the query and checks the numeric bounds.
    pub fn validate(mut self) -> Result<Self, GatewayError> {
        self.q = self.q.trim().to_string();
        if self.q.is_empty() {
            return Err(GatewayError::BadRequest(
                "Search query parameter \"q\" is required".to_string(),
            ));
        }
        if let Some(per_page) = self.per_page {
            if !(1..=MAX_PER_PAGE).contains(&per_page) {
                return Err(GatewayError::BadRequest(format!(
                    "per_page must be between 1 and {}",
                    MAX_PER_PAGE
                )));
            }
        }
        if self.page == Some(0) {
            return Err(GatewayError::BadRequest(
                "page must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn effective_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn effective_per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

/// Rate-limit metadata reported by GitHub on every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds
    pub reset: i64,
    pub used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl RateLimitSnapshot {
    /// Reads the `x-ratelimit-*` headers. Missing or malformed values are 0.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_number(headers, "x-ratelimit-limit"),
            remaining: header_number(headers, "x-ratelimit-remaining"),
            reset: header_number(headers, "x-ratelimit-reset"),
            used: header_number(headers, "x-ratelimit-used"),
            resource: headers
                .get("x-ratelimit-resource")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.reset <= 0 {
            return None;
        }
        Utc.timestamp_opt(self.reset, 0).single()
    }
}

fn header_number<T: std::str::FromStr + Default>(headers: &HeaderMap, name: &str) -> T {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringFactors {
    pub stars: String,
    pub forks: String,
    pub recency: String,
    pub activity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringInfo {
    pub algorithm_version: String,
    pub factors: ScoringFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub items: Vec<ScoredRepository>,
    pub page_info: PageInfo,
    pub rate_limit: RateLimitSnapshot,
    pub scoring_info: ScoringInfo,
}

/// Budget usage as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitInfo {
    pub requests_made: u32,
    pub requests_remaining: u32,
    pub reset_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredLimits {
    pub client_per_minute: u32,
    pub github_per_hour: u32,
    pub search_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStats {
    pub active_clients: usize,
    pub github_api: LimitInfo,
    pub limits: ConfiguredLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub version: String,
    pub cache: CacheStats,
    pub rate_limits: RateLimitStats,
}

/// Process-wide mutable state. Guarded by a single lock so that
/// check-then-increment sequences stay atomic.
pub struct AppState {
    pub cache: TtlCache<SearchResponse>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: &Config, clock: SharedClock) -> Self {
        Self {
            cache: TtlCache::new(config.cache.search_ttl_secs, clock.clone()),
            rate_limiter: RateLimiter::new(config.rate_limits.clone(), clock),
        }
    }
}
