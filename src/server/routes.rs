//! Request handlers

use crate::ics;
use crate::metrics::{self, Outcome};
use crate::server::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;

/// Builds the router
///
/// `/metrics` exposes the counters; every other path serves the aggregate.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_aggregate))
        .route("/metrics", get(serve_metrics))
        .fallback(serve_aggregate)
        .with_state(state)
}

/// GET / - the latest aggregate, or 500 if none was ever published
async fn serve_aggregate(State(state): State<AppState>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let remote = remote_addr(request.headers(), peer);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let Some(snapshot) = state.cache.current().await else {
        tracing::error!(user_agent = %user_agent, remote = %remote, "No content");
        state.metrics.record_in_request(Outcome::Err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, ics::CONTENT_TYPE)],
        snapshot.body.clone(),
    )
        .into_response();

    if let Ok(value) = HeaderValue::from_str(&http_date(snapshot.published_at)) {
        response.headers_mut().insert(header::LAST_MODIFIED, value);
    }

    tracing::info!(user_agent = %user_agent, remote = %remote, "Served");
    state.metrics.record_in_request(Outcome::Ok);
    response
}

/// GET /metrics - counters in the Prometheus text format
async fn serve_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, metrics::CONTENT_TYPE)],
        state.metrics.render(),
    )
}

/// Address of the requester, preferring `X-Forwarded-For` over the peer address
pub fn remote_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
