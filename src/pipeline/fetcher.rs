//! Authenticated HTTP fetcher
//!
//! Every upstream read goes through [`SourceFetcher::fetch`]:
//! - Basic auth with the configured credentials
//! - No retries; anything outside 2xx is an error
//! - Response bodies are always read to the end, including on error paths
//! - The caller's cancellation token aborts the request immediately

use crate::config::UpstreamConfig;
use crate::metrics::Metrics;
use crate::FetchError;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Builds the shared HTTP client
///
/// # Arguments
///
/// * `config` - Upstream configuration supplying the timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UpstreamConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("calproxy/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Basic auth credentials sent with every request
///
/// Sent whenever either part is set, so a password configured without a
/// user still goes out as `:pass`.
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.pass.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Stateless wrapper issuing authenticated GET requests
pub struct SourceFetcher {
    client: Client,
    credentials: Credentials,
    metrics: Arc<Metrics>,
}

impl SourceFetcher {
    pub fn new(client: Client, credentials: Credentials, metrics: Arc<Metrics>) -> Self {
        Self {
            client,
            credentials,
            metrics,
        }
    }

    /// Builds a fetcher with its own client from the upstream configuration
    pub fn from_config(config: &UpstreamConfig, metrics: Arc<Metrics>) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        let credentials = Credentials::new(config.user.clone(), config.pass.clone());
        Ok(Self::new(client, credentials, metrics))
    }

    /// Fetches a URL and returns its body
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Body of a 2xx response
    /// * `Err(FetchError)` - Non-2xx status, transport failure, or cancellation
    pub async fn fetch(&self, url: &Url, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        self.metrics.record_outgoing_request();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled {
                url: url.to_string(),
            }),
            result = self.send(url) => result,
        }
    }

    async fn send(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url.clone());
        if !self.credentials.is_empty() {
            let pass = Some(&self.credentials.pass).filter(|p| !p.is_empty());
            request = request.basic_auth(&self.credentials.user, pass);
        }

        let response = request.send().await.map_err(|e| classify(url, e))?;
        let status = response.status();

        if !status.is_success() {
            // Drain so the connection can be reused
            let _ = response.bytes().await;
            tracing::debug!(url = %url, status = status.as_u16(), "Upstream returned an error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        tracing::trace!(url = %url, bytes = body.len(), "Fetched");
        Ok(body.to_vec())
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify(url: &Url, error: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::Connect {
            url,
            message: error.to_string(),
        }
    } else {
        FetchError::Transport { url, source: error }
    }
}
