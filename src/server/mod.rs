//! HTTP server
//!
//! Serves the cached aggregate verbatim and the process counters. Requests
//! never trigger upstream work; they only read the cache.

mod routes;

pub use routes::{remote_addr, router};

use crate::cache::AggregateCache;
use crate::metrics::Metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<AggregateCache>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(cache: Arc<AggregateCache>, metrics: Arc<Metrics>) -> Self {
        Self { cache, metrics }
    }
}

/// Serves requests on `listener` until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let app = router(state);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://{}", addr);
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
}
