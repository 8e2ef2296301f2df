pub mod cache;
pub mod clock;
pub mod config;
pub mod errors;
pub mod github;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod scoring;
pub mod services;

pub use errors::{GatewayError, RateLimitError};
pub use models::{AppState, Repository, ScoredRepository, SearchRequest, SearchResponse};
pub use services::RepositoryService;
