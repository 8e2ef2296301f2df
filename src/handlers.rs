use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use warp::Reply;

use crate::errors::GatewayError;
use crate::models::SearchRequest;
use crate::services::RepositoryService;


#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
    #[serde(rename = "reset_time", skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<DateTime<Utc>>,
}

pub async fn search_repositories(
    request: SearchRequest,
    client_id: String,
    service: Arc<RepositoryService>,
) -> Result<impl Reply, warp::Rejection> {
    info!("Search request from {}: {:?}", client_id, request);
    let response = service
        .search(request, Some(client_id.as_str()))
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&response))
}

pub async fn health_check(service: Arc<RepositoryService>) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&service.health().await))
}

pub async fn handle_rejection(err: warp::Rejection) -> Result<impl Reply, Infallible> {
    let (code, message, reset_time) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string(), None)
    } else if let Some(e) = err.find::<GatewayError>() {
        (e.status_code(), e.to_string(), e.reset_time())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string(), None)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
            None,
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
            None,
        )
    };

    let body = ErrorBody {
        status_code: code.as_u16(),
        error: code.canonical_reason().unwrap_or("Error").to_string(),
        message,
        reset_time,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), code))
}
