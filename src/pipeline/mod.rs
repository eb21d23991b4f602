//! Refresh pipeline: index discovery, feed fetching and merging
//!
//! This module contains the acquisition side of the proxy:
//! - Authenticated fetching of single resources
//! - Resolving source feed paths from the index page
//! - Fetching and merging feeds under bounded concurrency
//! - Driving refresh cycles on a fixed interval

mod aggregator;
mod fetcher;
mod index;
mod scheduler;

pub use aggregator::{source_url, AggregateReport, Aggregator, DEFAULT_MAX_CONCURRENT};
pub use fetcher::{build_http_client, Credentials, SourceFetcher};
pub use index::{parse_index, resolve_sources};
pub use scheduler::{RefreshOutcome, RefreshScheduler};

use std::fmt;

/// Relative path of one source feed, as linked from the index page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceReference(String);

impl SourceReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceReference {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
