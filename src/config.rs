use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const CLIENT_WINDOW_SECS: i64 = 60; // per-client fixed window
pub const GITHUB_WINDOW_SECS: i64 = 3600; // upstream fixed window
pub const MAX_SEARCH_RESULTS: u64 = 1000; // GitHub never pages past this

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub rate_limits: RateLimitConfig,
    pub cache: CacheConfig,
    pub scoring: ScoringWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Origins allowed by the CORS headers. `*` allows any origin.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token; requests are unauthenticated without one
    pub token: Option<String>,
    pub api_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Remaining-quota threshold at or below which a warning is logged
    pub rate_limit_buffer: u32,
    /// First retry delay; doubles on each further attempt
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub client_requests_per_minute: u32,
    pub github_api_per_hour: u32,
    pub search_api_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for memoized search responses, in seconds
    pub search_ttl_secs: u64,
    /// How often expired cache entries and stale client windows are swept
    pub cleanup_interval_secs: u64,
}

/// Weights of the ranking formula. Built once and shared read-only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub stars: f64,
    pub forks: f64,
    pub recency: f64,
    pub activity: f64,
    pub watchers: f64,
    pub open_issues: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            stars: 0.40,
            forks: 0.25,
            recency: 0.20,
            activity: 0.15,
            watchers: 0.60,
            open_issues: 0.40,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            timeout_ms: 5000,
            max_retries: 3,
            rate_limit_buffer: 10,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            client_requests_per_minute: 60,
            github_api_per_hour: 5000,
            search_api_per_minute: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_secs: 300,
            cleanup_interval_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            github: GitHubConfig::default(),
            rate_limits: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Values that fail to
    /// parse leave the default in place.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        parse_into(&lookup, "PORT", &mut config.server.port);
        if let Some(origins) = lookup("CORS_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if !origins.is_empty() {
                config.server.cors_origins = origins;
            }
        }

        if let Some(token) = lookup("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                config.github.token = Some(token);
            }
        }
        if let Some(url) = lookup("GITHUB_API_URL") {
            config.github.api_url = url.trim_end_matches('/').to_string();
        }
        parse_into(&lookup, "GITHUB_TIMEOUT", &mut config.github.timeout_ms);
        parse_into(&lookup, "GITHUB_MAX_RETRIES", &mut config.github.max_retries);
        parse_into(
            &lookup,
            "GITHUB_RATE_LIMIT_BUFFER",
            &mut config.github.rate_limit_buffer,
        );
        parse_into(
            &lookup,
            "GITHUB_RETRY_BASE_DELAY_MS",
            &mut config.github.retry_base_delay_ms,
        );

        parse_into(
            &lookup,
            "RATE_LIMIT_CLIENT_PER_MINUTE",
            &mut config.rate_limits.client_requests_per_minute,
        );
        parse_into(
            &lookup,
            "RATE_LIMIT_GITHUB_PER_HOUR",
            &mut config.rate_limits.github_api_per_hour,
        );
        parse_into(
            &lookup,
            "RATE_LIMIT_SEARCH_PER_MINUTE",
            &mut config.rate_limits.search_api_per_minute,
        );

        parse_into(&lookup, "CACHE_SEARCH_TTL", &mut config.cache.search_ttl_secs);
        parse_into(
            &lookup,
            "CACHE_CLEANUP_INTERVAL",
            &mut config.cache.cleanup_interval_secs,
        );

        config
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring unparseable {}={}", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.rate_limits.client_requests_per_minute, 60);
        assert_eq!(config.rate_limits.github_api_per_hour, 5000);
        assert_eq!(config.cache.search_ttl_secs, 300);
        assert_eq!(config.github.rate_limit_buffer, 10);
        assert_eq!(config.github.token, None);
        assert_eq!(config.scoring, ScoringWeights::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test"),
            ("GITHUB_TOKEN", "abc"),
            ("GITHUB_API_URL", "http://localhost:9999/"),
            ("RATE_LIMIT_CLIENT_PER_MINUTE", "5"),
            ("CACHE_SEARCH_TTL", "10"),
        ]));
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.github.token.as_deref(), Some("abc"));
        assert_eq!(config.github.api_url, "http://localhost:9999");
        assert_eq!(config.rate_limits.client_requests_per_minute, 5);
        assert_eq!(config.cache.search_ttl_secs, 10);
        assert_eq!(config.socket_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("RATE_LIMIT_GITHUB_PER_HOUR", "-1"),
            ("GITHUB_TOKEN", "   "),
        ]));
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.rate_limits.github_api_per_hour, 5000);
        assert_eq!(config.github.token, None);
    }
}
