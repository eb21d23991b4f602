//! Refresh scheduler
//!
//! Runs one refresh cycle at startup and then one per interval tick. A cycle
//! is awaited before the next tick is considered, so cycles never overlap.
//! A failed cycle leaves the previously published aggregate in place.

use crate::cache::AggregateCache;
use crate::config::Config;
use crate::metrics::{Metrics, Outcome};
use crate::pipeline::aggregator::Aggregator;
use crate::pipeline::fetcher::SourceFetcher;
use crate::pipeline::index::resolve_sources;
use crate::CalproxyError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Summary of a successful refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub sources_total: usize,
    pub sources_failed: usize,
    pub events: usize,
    pub timezones: usize,
}

/// Drives index resolution and aggregation, publishing into the cache
pub struct RefreshScheduler {
    fetcher: Arc<SourceFetcher>,
    aggregator: Aggregator,
    cache: Arc<AggregateCache>,
    metrics: Arc<Metrics>,
    base: Url,
    interval: Duration,
    cycle_timeout: Duration,
}

impl RefreshScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetcher shared by index resolution and aggregation
    /// * `cache` - Cache receiving each successful aggregate
    /// * `metrics` - Process counters
    /// * `base` - URL of the index page
    /// * `max_concurrent` - Size of the admission pool
    pub fn new(
        fetcher: Arc<SourceFetcher>,
        cache: Arc<AggregateCache>,
        metrics: Arc<Metrics>,
        base: Url,
        max_concurrent: usize,
    ) -> Self {
        let aggregator = Aggregator::with_max_concurrent(Arc::clone(&fetcher), max_concurrent);
        Self {
            fetcher,
            aggregator,
            cache,
            metrics,
            base,
            interval: Duration::from_secs(2 * 60 * 60),
            cycle_timeout: Duration::from_secs(10 * 60),
        }
    }

    /// Builds a scheduler from validated configuration
    pub fn from_config(
        config: &Config,
        cache: Arc<AggregateCache>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, CalproxyError> {
        let base = config.target_url()?;
        let fetcher = Arc::new(SourceFetcher::from_config(
            &config.upstream,
            Arc::clone(&metrics),
        )?);

        Ok(Self::new(
            fetcher,
            cache,
            metrics,
            base,
            config.refresh.max_concurrent_fetches,
        )
        .with_interval(config.refresh_interval())
        .with_cycle_timeout(config.cycle_timeout()))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cycle_timeout(mut self, cycle_timeout: Duration) -> Self {
        self.cycle_timeout = cycle_timeout;
        self
    }

    /// Runs a single refresh cycle
    ///
    /// The cycle gets its own cancellation token, a child of `cancel`, which
    /// is also cancelled once the cycle timeout elapses. A timed-out cycle
    /// still publishes what it merged; a cycle whose parent `cancel` fired
    /// publishes nothing.
    ///
    /// # Returns
    ///
    /// * `Ok(RefreshOutcome)` - A new aggregate was published
    /// * `Err(CalproxyError::Shutdown)` - `cancel` fired; the cache is unchanged
    /// * `Err(CalproxyError)` - The index could not be resolved; the cache is unchanged
    pub async fn refresh_once(&self, cancel: &CancellationToken) -> Result<RefreshOutcome, CalproxyError> {
        let cycle = cancel.child_token();

        let work = self.run_cycle(cancel, &cycle);
        let deadline = tokio::time::sleep(self.cycle_timeout);
        tokio::pin!(work, deadline);

        let result = loop {
            tokio::select! {
                result = &mut work => break result,
                _ = &mut deadline, if !cycle.is_cancelled() => {
                    tracing::warn!(
                        timeout = ?self.cycle_timeout,
                        "Refresh cycle timed out, cancelling in-flight fetches"
                    );
                    cycle.cancel();
                }
            }
        };

        match &result {
            Ok(outcome) => {
                self.metrics.record_refresh(Outcome::Ok);
                self.metrics
                    .record_source_failures(outcome.sources_failed as u64);
                self.metrics
                    .set_aggregate_entries((outcome.events + outcome.timezones) as u64);
            }
            Err(CalproxyError::Shutdown) => {}
            Err(_) => self.metrics.record_refresh(Outcome::Err),
        }

        result
    }

    async fn run_cycle(
        &self,
        shutdown: &CancellationToken,
        cycle: &CancellationToken,
    ) -> Result<RefreshOutcome, CalproxyError> {
        let sources = match resolve_sources(&self.fetcher, &self.base, cycle).await {
            Err(_) if shutdown.is_cancelled() => return Err(CalproxyError::Shutdown),
            result => result?,
        };
        tracing::info!(url = %self.base, sources = sources.len(), "Discovered source feeds");

        let report = self.aggregator.aggregate(&self.base, sources, cycle).await;

        // Sources cut off by shutdown would replace a good aggregate with a partial one
        if shutdown.is_cancelled() {
            return Err(CalproxyError::Shutdown);
        }
        let cached = self
            .cache
            .publish(&report.document, report.sources_ok(), report.sources_total)
            .await;

        Ok(RefreshOutcome {
            sources_total: report.sources_total,
            sources_failed: report.sources_failed,
            events: cached.events,
            timezones: cached.timezones,
        })
    }

    /// Runs refresh cycles until `shutdown` is cancelled
    ///
    /// The first cycle starts immediately. Failures are logged and the loop
    /// carries on with the next tick.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.interval, "Refresh scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.refresh_once(&shutdown).await {
                Ok(outcome) => tracing::info!(
                    sources = outcome.sources_total,
                    failed = outcome.sources_failed,
                    events = outcome.events,
                    timezones = outcome.timezones,
                    "Refresh cycle complete"
                ),
                Err(CalproxyError::Shutdown) => {
                    tracing::info!("Refresh cycle abandoned for shutdown, keeping previous aggregate")
                }
                Err(e) => tracing::error!("Refresh cycle failed, keeping previous aggregate: {}", e),
            }
        }

        tracing::info!("Refresh scheduler stopped");
    }
}
