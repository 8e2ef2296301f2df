//! Fixed-window request budgets.
//!
//! Two independent budgets are tracked: one window per client id, and a
//! single process-wide window for calls made to the GitHub API. The GitHub
//! window is a local estimate whose count and reset time are overwritten by
//! what the API reports in its `x-ratelimit-*` headers. The limit itself is
//! always the configured hourly budget.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, error, warn};

use crate::clock::SharedClock;
use crate::config::{RateLimitConfig, CLIENT_WINDOW_SECS, GITHUB_WINDOW_SECS};
use crate::errors::RateLimitError;
use crate::models::{ConfiguredLimits, LimitInfo, RateLimitSnapshot, RateLimitStats};


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub count: u32,
    pub reset_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GitHubBudget {
    count: u32,
    reset_time: DateTime<Utc>,
}

pub struct RateLimiter {
    clients: HashMap<String, ClientWindow>,
    github: GitHubBudget,
    config: RateLimitConfig,
    clock: SharedClock,
}

fn client_window() -> Duration {
    Duration::seconds(CLIENT_WINDOW_SECS)
}

fn github_window() -> Duration {
    Duration::seconds(GITHUB_WINDOW_SECS)
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: SharedClock) -> Self {
        let now = clock.now();
        Self {
            clients: HashMap::new(),
            github: GitHubBudget {
                count: 0,
                reset_time: now + github_window(),
            },
            config,
            clock,
        }
    }

    /// Counts one request against `client_id`'s window, or fails if the
    /// window is already full. Any string is a valid id, including "".
    pub fn check_client_rate_limit(&mut self, client_id: &str) -> Result<(), RateLimitError> {
        let now = self.clock.now();
        let limit = self.config.client_requests_per_minute;
        let window = self
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientWindow {
                count: 0,
                reset_time: now + client_window(),
            });

        if now >= window.reset_time {
            window.count = 0;
            window.reset_time = now + client_window();
        }

        if window.count >= limit {
            warn!("Rate limit exceeded for client {}", client_id);
            return Err(RateLimitError::Client {
                client_id: client_id.to_string(),
                reset_time: window.reset_time,
            });
        }

        window.count += 1;
        Ok(())
    }

    /// Counts one outbound call against the GitHub budget.
    pub fn check_github_api_limit(&mut self) -> Result<(), RateLimitError> {
        let now = self.clock.now();

        if now >= self.github.reset_time {
            self.github.count = 0;
            self.github.reset_time = now + github_window();
        }

        if self.github.count >= self.config.github_api_per_hour {
            error!("GitHub API rate limit exceeded");
            return Err(RateLimitError::GitHub {
                reset_time: self.github.reset_time,
            });
        }

        self.github.count += 1;
        Ok(())
    }

    /// Replaces the local GitHub count and reset time with what the API
    /// reported. The count may move backwards or forwards.
    pub fn update_github_api_usage(&mut self, snapshot: &RateLimitSnapshot) {
        if let Some(reset_at) = snapshot.reset_at() {
            self.github.reset_time = reset_at;
        }
        self.github.count = snapshot.used;

        debug!(
            "GitHub API usage updated: {} used, {} remaining, resets at {}",
            snapshot.used,
            snapshot.remaining,
            self.github.reset_time.to_rfc3339()
        );
    }

    pub fn client_limit_info(&self, client_id: &str) -> LimitInfo {
        let limit = self.config.client_requests_per_minute;
        match self.clients.get(client_id) {
            Some(window) => LimitInfo {
                requests_made: window.count,
                requests_remaining: limit.saturating_sub(window.count),
                reset_time: window.reset_time,
            },
            None => LimitInfo {
                requests_made: 0,
                requests_remaining: limit,
                reset_time: self.clock.now() + client_window(),
            },
        }
    }

    pub fn github_limit_info(&self) -> LimitInfo {
        LimitInfo {
            requests_made: self.github.count,
            requests_remaining: self
                .config
                .github_api_per_hour
                .saturating_sub(self.github.count),
            reset_time: self.github.reset_time,
        }
    }

    /// Drops client windows whose reset time is more than an hour in the
    /// past. This is the only eviction for client entries.
    pub fn cleanup(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.clients.len();
        self.clients
            .retain(|_, window| now - window.reset_time <= github_window());
        let removed = before - self.clients.len();

        if removed > 0 {
            debug!("Cleaned up {} old rate limit entries", removed);
        }
        removed
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            active_clients: self.clients.len(),
            github_api: self.github_limit_info(),
            limits: ConfiguredLimits {
                client_per_minute: self.config.client_requests_per_minute,
                github_per_hour: self.config.github_api_per_hour,
                search_per_minute: self.config.search_api_per_minute,
            },
        }
    }

    pub fn client_window(&self, client_id: &str) -> Option<&ClientWindow> {
        self.clients.get(client_id)
    }
}
