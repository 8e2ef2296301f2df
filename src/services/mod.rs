use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::cache::generate_search_key;
use crate::clock::SharedClock;
use crate::config::{Config, MAX_SEARCH_RESULTS};
use crate::errors::GatewayError;
use crate::github::RepositorySearch;
use crate::models::{AppState, HealthReport, PageInfo, SearchRequest, SearchResponse};
use crate::scoring::Scorer;


pub const SERVICE_NAME: &str = "repository-ranker";

/// Runs a search through the rate limiter, the cache, GitHub and the scorer.
pub struct RepositoryService {
    state: Arc<RwLock<AppState>>,
    github: Arc<dyn RepositorySearch>,
    scorer: Scorer,
    clock: SharedClock,
}

impl RepositoryService {
    pub fn new(config: &Config, github: Arc<dyn RepositorySearch>, clock: SharedClock) -> Self {
        Self {
            state: Arc::new(RwLock::new(AppState::new(config, clock.clone()))),
            github,
            scorer: Scorer::new(config.scoring, clock.clone()),
            clock,
        }
    }

    pub fn state(&self) -> &Arc<RwLock<AppState>> {
        &self.state
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub async fn search(
        &self,
        request: SearchRequest,
        client_id: Option<&str>,
    ) -> Result<SearchResponse, GatewayError> {
        let request = request.validate()?;
        let query = request.q.clone();

        let result = self.search_validated(&request, client_id).await;
        if let Err(e) = &result {
            error!("Search failed for query \"{}\": {}", query, e);
        }
        result
    }

    async fn search_validated(
        &self,
        request: &SearchRequest,
        client_id: Option<&str>,
    ) -> Result<SearchResponse, GatewayError> {
        let cache_key = generate_search_key(&request.q, request);

        // The lock is not held across the upstream call.
        {
            let mut state = self.state.write().await;
            if let Some(client_id) = client_id {
                state.rate_limiter.check_client_rate_limit(client_id)?;
            }
            if let Some(cached) = state.cache.get(&cache_key) {
                info!("Cache hit for query: {}", request.q);
                return Ok(cached);
            }
            state.rate_limiter.check_github_api_limit()?;
        }

        let github_response = self.github.search_repositories(request).await?;
        let items = self.scorer.score_repositories(github_response.items);
        let per_page = request.effective_per_page();

        let response = SearchResponse {
            total_count: github_response.total_count,
            incomplete_results: github_response.incomplete_results,
            page_info: PageInfo {
                current_page: request.effective_page(),
                per_page,
                total_pages: total_pages(github_response.total_count, per_page),
            },
            items,
            rate_limit: github_response.rate_limit,
            scoring_info: self.scorer.scoring_info(),
        };

        {
            let mut state = self.state.write().await;
            state
                .rate_limiter
                .update_github_api_usage(&response.rate_limit);
            state.cache.set(&cache_key, response.clone());
        }

        info!(
            "Returning {} scored repositories for query: {}",
            response.items.len(),
            request.q
        );
        Ok(response)
    }

    pub async fn health(&self) -> HealthReport {
        let state = self.state.read().await;
        HealthReport {
            status: "ok".to_string(),
            timestamp: self.clock.now(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            cache: state.cache.stats(),
            rate_limits: state.rate_limiter.stats(),
        }
    }

    /// Sweeps expired cache entries and stale client windows. Returns the
    /// number of each removed.
    pub async fn cleanup(&self) -> (usize, usize) {
        let mut state = self.state.write().await;
        (state.cache.cleanup(), state.rate_limiter.cleanup())
    }
}

/// GitHub serves at most 1000 results for any search.
pub fn total_pages(total_count: u64, per_page: u32) -> u64 {
    let per_page = u64::from(per_page.max(1));
    let reachable = total_count.min(MAX_SEARCH_RESULTS);
    (reachable + per_page - 1) / per_page
}
