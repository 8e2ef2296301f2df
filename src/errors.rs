use chrono::{DateTime, SecondsFormat, Utc};
use hyper::StatusCode;
use thiserror::Error;

/// A request budget ran out. Always retryable once `reset_time` passes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded. Try again after {}", rfc3339(.reset_time))]
    Client {
        client_id: String,
        reset_time: DateTime<Utc>,
    },
    #[error("GitHub API rate limit exceeded. Try again after {}", rfc3339(.reset_time))]
    GitHub { reset_time: DateTime<Utc> },
}

impl RateLimitError {
    pub fn reset_time(&self) -> DateTime<Utc> {
        match self {
            Self::Client { reset_time, .. } | Self::GitHub { reset_time } => *reset_time,
        }
    }

    pub fn is_retryable(&self) -> bool {
        true
    }
}

fn rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("GitHub API error: {0}")]
    Upstream(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Unavailable(_) | Self::Timeout
        )
    }

    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::RateLimited(e) => Some(e.reset_time()),
            _ => None,
        }
    }
}

impl warp::reject::Reject for GatewayError {}
