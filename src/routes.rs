use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::handlers;
use crate::middleware;
use crate::models::SearchRequest;
use crate::services::RepositoryService;

/// All HTTP routes, with errors rendered as JSON and CORS headers applied.
pub fn routes(
    service: Arc<RepositoryService>,
    cors_origins: Vec<String>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let service_filter = warp::any().map(move || service.clone());

    let health_check = warp::path!("health")
        .and(warp::get())
        .map(|| "OK");

    let client = warp::header::optional::<String>("x-forwarded-for")
        .and(warp::addr::remote())
        .map(|forwarded: Option<String>, remote: Option<SocketAddr>| {
            middleware::client_id(forwarded.as_deref(), remote)
        });

    let search = warp::path!("api" / "repositories" / "search")
        .and(warp::get())
        .and(warp::query::<SearchRequest>())
        .and(client)
        .and(service_filter.clone())
        .and_then(handlers::search_repositories);

    let repository_health = warp::path!("api" / "repositories" / "health")
        .and(warp::get())
        .and(service_filter)
        .and_then(handlers::health_check);

    let api = health_check
        .or(search)
        .or(repository_health)
        .recover(handlers::handle_rejection);

    with_cors(api, Arc::new(cors_origins))
}

fn with_cors<F, R>(
    filter: F,
    cors_origins: Arc<Vec<String>>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone
where
    F: Filter<Extract = (R,), Error = Infallible> + Clone + Send + Sync + 'static,
    R: Reply,
{
    warp::header::optional::<String>("origin")
        .and(filter)
        .map(move |origin: Option<String>, reply: R| {
            let mut response = reply.into_response();
            if let Some(allowed) = middleware::allowed_origin(origin.as_deref(), &cors_origins) {
                middleware::add_cors_headers(response.headers_mut(), &allowed);
            }
            response
        })
}
