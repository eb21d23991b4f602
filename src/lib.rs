//! calproxy: a calendar feed aggregator
//!
//! This crate discovers calendar feeds from an index page, fetches them under
//! bounded concurrency, merges their events and timezones into a single
//! iCalendar document, and serves the latest aggregate over HTTP.

pub mod cache;
pub mod config;
pub mod ics;
pub mod metrics;
pub mod pipeline;
pub mod server;

use thiserror::Error;

/// Main error type for calproxy operations
#[derive(Debug, Error)]
pub enum CalproxyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("URL parse error: {0}")]
    InvalidUrl(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refresh abandoned: shutdown requested")]
    Shutdown,
}

/// Failure to read a single remote resource
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Request to {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// Returns the HTTP status code when the server answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the URL the failed request was made against
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Timeout { url }
            | FetchError::Connect { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Cancelled { url } => url,
        }
    }
}

/// Malformed markup or calendar bytes
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed index markup: {0}")]
    Markup(String),

    #[error("Malformed calendar feed: {0}")]
    Feed(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("No target URL configured (set --target or TARGET)")]
    MissingTarget,
}

/// Result type alias for calproxy operations
pub type Result<T> = std::result::Result<T, CalproxyError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::{AggregateCache, CachedAggregate};
pub use config::Config;
pub use ics::{AggregateDocument, CalendarEntry};
pub use metrics::Metrics;
pub use pipeline::{Aggregator, RefreshScheduler, SourceFetcher, SourceReference};
