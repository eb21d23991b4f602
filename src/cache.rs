//! In-memory holder of the latest published aggregate
//!
//! The refresh scheduler is the only writer; request handlers read
//! concurrently. The aggregate is serialized once at publish time and swapped
//! in as a whole, so a reader sees either the previous or the new body.

use crate::ics::{serialize, AggregateDocument};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A serialized aggregate ready to be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAggregate {
    /// iCalendar text of the aggregate
    pub body: String,

    pub events: usize,
    pub timezones: usize,

    /// Sources that contributed to this aggregate
    pub sources_ok: usize,

    /// Sources discovered on the index page for this cycle
    pub sources_total: usize,

    /// When the aggregate was published
    pub published_at: DateTime<Utc>,
}

impl CachedAggregate {
    /// Total number of merged entries
    pub fn entries(&self) -> usize {
        self.events + self.timezones
    }
}

/// Process-wide cache of the latest aggregate
///
/// Starts unpopulated. `None` means no refresh has ever succeeded, which is
/// distinct from a populated aggregate with zero entries.
#[derive(Debug, Default)]
pub struct AggregateCache {
    current: RwLock<Option<Arc<CachedAggregate>>>,
}

impl AggregateCache {
    /// Creates an unpopulated cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `doc` and replaces the cached value with it
    ///
    /// Encoding happens before the write lock is taken so readers are only
    /// excluded for the pointer swap.
    pub async fn publish(
        &self,
        doc: &AggregateDocument,
        sources_ok: usize,
        sources_total: usize,
    ) -> Arc<CachedAggregate> {
        let cached = Arc::new(CachedAggregate {
            body: serialize(doc),
            events: doc.event_count(),
            timezones: doc.timezone_count(),
            sources_ok,
            sources_total,
            published_at: Utc::now(),
        });

        *self.current.write().await = Some(Arc::clone(&cached));
        tracing::debug!(
            events = cached.events,
            timezones = cached.timezones,
            sources = cached.sources_ok,
            discovered = cached.sources_total,
            bytes = cached.body.len(),
            "Published aggregate"
        );
        cached
    }

    /// Returns a snapshot of the current aggregate, if any was published
    pub async fn current(&self) -> Option<Arc<CachedAggregate>> {
        self.current.read().await.clone()
    }

    pub async fn is_populated(&self) -> bool {
        self.current.read().await.is_some()
    }
}
