use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use repo_ranker::{
    clock::{SharedClock, SystemClock},
    config::Config,
    github::GitHubClient,
    routes::routes,
    RepositoryService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let addr: SocketAddr = config.socket_addr().parse()?;
    tracing::info!("GitHub API: {}", config.github.api_url);

    let clock: SharedClock = Arc::new(SystemClock);
    let github = Arc::new(GitHubClient::new(config.github.clone(), clock.clone())?);
    let service = Arc::new(RepositoryService::new(&config, github, clock));

    let sweeper = service.clone();
    let interval_secs = config.cache.cleanup_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let (expired, stale) = sweeper.cleanup().await;
            if expired + stale > 0 {
                tracing::debug!(
                    "Periodic cleanup removed {} cache entries and {} client windows",
                    expired,
                    stale
                );
            }
        }
    });

    let routes = routes(service, config.server.cors_origins.clone());

    tracing::info!("Repository ranker running on http://{}", addr);
    warp::serve(routes).run(addr).await;
    Ok(())
}
