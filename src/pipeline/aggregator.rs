//! Feed aggregation - concurrent fetch and single-writer merge
//!
//! Each source is handled by its own task:
//!
//! 1. Acquire a slot in the admission pool (at most `max_concurrent` sources in flight)
//! 2. Fetch the feed
//! 3. Decode it into calendar entries
//! 4. Send events and timezones to the merge task; log and drop anything else
//!
//! The merge task is the only owner of the document being built. Once every
//! source task has been joined it receives the done signal, drains what is
//! still queued and hands the finished document back.
//!
//! A failing source contributes nothing and never aborts the aggregation.

use crate::ics::{parse_feed, AggregateDocument, CalendarEntry, Component};
use crate::pipeline::fetcher::SourceFetcher;
use crate::pipeline::SourceReference;
use crate::CalproxyError;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Default size of the admission pool
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Capacity of the timezone channel; events get one slot per source
const TIMEZONE_CHANNEL_CAPACITY: usize = 16;

/// Result of one aggregation
#[derive(Debug)]
pub struct AggregateReport {
    /// The merged document
    pub document: AggregateDocument,

    /// Sources handed to the aggregation
    pub sources_total: usize,

    /// Sources dropped because their fetch or decode failed
    pub sources_failed: usize,
}

impl AggregateReport {
    pub fn sources_ok(&self) -> usize {
        self.sources_total - self.sources_failed
    }
}

/// Entries one source sent to the merge task
#[derive(Debug, Default, Clone, Copy)]
struct SourceEntries {
    events: usize,
    timezones: usize,
    unhandled: usize,
}

/// Fetches and merges source feeds
pub struct Aggregator {
    fetcher: Arc<SourceFetcher>,
    max_concurrent: usize,
}

impl Aggregator {
    /// Creates an aggregator with the default admission pool size
    pub fn new(fetcher: Arc<SourceFetcher>) -> Self {
        Self::with_max_concurrent(fetcher, DEFAULT_MAX_CONCURRENT)
    }

    pub fn with_max_concurrent(fetcher: Arc<SourceFetcher>, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Fetches every source and merges their events and timezones
    ///
    /// Never fails: with zero sources, or when every source fails, the
    /// returned document is empty. Cancelling `cancel` makes in-flight
    /// fetches fail, which drops those sources from the result.
    ///
    /// # Arguments
    ///
    /// * `base` - Index page URL; its scheme and host are used for every source
    /// * `sources` - Source paths discovered on the index page
    /// * `cancel` - Cancellation signal for the whole cycle
    pub async fn aggregate(
        &self,
        base: &Url,
        sources: Vec<SourceReference>,
        cancel: &CancellationToken,
    ) -> AggregateReport {
        let sources_total = sources.len();

        let (event_tx, event_rx) = mpsc::channel(sources_total.max(1));
        let (timezone_tx, timezone_rx) = mpsc::channel(TIMEZONE_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = oneshot::channel();
        let merge = tokio::spawn(merge_entries(event_rx, timezone_rx, done_rx));

        let admission = Arc::new(Semaphore::new(self.max_concurrent));
        let mut workers = JoinSet::new();

        for source in sources {
            let url = source_url(base, &source);

            // The semaphore is never closed
            let Ok(permit) = Arc::clone(&admission).acquire_owned().await else {
                break;
            };

            let fetcher = Arc::clone(&self.fetcher);
            let event_tx = event_tx.clone();
            let timezone_tx = timezone_tx.clone();
            let cancel = cancel.clone();

            workers.spawn(async move {
                let result =
                    process_source(&fetcher, &source, &url, &event_tx, &timezone_tx, &cancel).await;
                drop(permit);
                (source, result)
            });
        }

        drop(event_tx);
        drop(timezone_tx);

        let mut sources_failed = 0;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((source, Ok(entries))) => {
                    tracing::debug!(
                        source = %source,
                        events = entries.events,
                        timezones = entries.timezones,
                        unhandled = entries.unhandled,
                        "Merged source"
                    );
                }
                Ok((source, Err(e))) => {
                    tracing::warn!(source = %source, "Dropping source: {}", e);
                    sources_failed += 1;
                }
                Err(e) => {
                    tracing::error!("Source task failed: {}", e);
                    sources_failed += 1;
                }
            }
        }

        // Every worker has finished sending; only now may the merge task stop
        let _ = done_tx.send(());
        let document = match merge.await {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("Merge task failed: {}", e);
                AggregateDocument::new()
            }
        };

        tracing::info!(
            sources = sources_total,
            failed = sources_failed,
            events = document.event_count(),
            timezones = document.timezone_count(),
            "Aggregation complete"
        );

        AggregateReport {
            document,
            sources_total,
            sources_failed,
        }
    }
}

/// Builds the absolute URL of a source from the index page URL
///
/// Scheme, host and port come from `base`; the reference becomes the path
/// (and query, if it has one). Credentials and fragments are not carried over.
///
/// # Example
///
/// ```
/// use calproxy::pipeline::{source_url, SourceReference};
/// use url::Url;
///
/// let base = Url::parse("https://cal.example.com:8443/index/?sort=name").unwrap();
/// let url = source_url(&base, &SourceReference::from("/feeds/a.ics"));
/// assert_eq!(url.as_str(), "https://cal.example.com:8443/feeds/a.ics");
/// ```
pub fn source_url(base: &Url, source: &SourceReference) -> Url {
    let reference = source.as_str();
    let reference = reference.split('#').next().unwrap_or_default();
    let (path, query) = match reference.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (reference, None),
    };

    let mut url = base.clone();
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.set_fragment(None);
    url.set_path(path);
    url.set_query(query);
    url
}

/// Fetches, decodes and dispatches the entries of one source
async fn process_source(
    fetcher: &SourceFetcher,
    source: &SourceReference,
    url: &Url,
    event_tx: &mpsc::Sender<Component>,
    timezone_tx: &mpsc::Sender<Component>,
    cancel: &CancellationToken,
) -> Result<SourceEntries, CalproxyError> {
    let body = fetcher.fetch(url, cancel).await?;
    let entries = parse_feed(&body)?;

    let mut counts = SourceEntries::default();
    for entry in entries {
        let sent = match entry {
            CalendarEntry::Event(event) => {
                counts.events += 1;
                event_tx.send(event).await
            }
            CalendarEntry::Timezone(timezone) => {
                counts.timezones += 1;
                timezone_tx.send(timezone).await
            }
            CalendarEntry::Unhandled { kind } => {
                tracing::warn!(source = %source, kind = %kind, "Dropping unhandled entry");
                counts.unhandled += 1;
                Ok(())
            }
        };

        if sent.is_err() {
            // Only happens if the merge task is gone
            tracing::error!(source = %source, "Merge task stopped receiving entries");
            break;
        }
    }

    Ok(counts)
}

/// Sole writer of the aggregate under construction
async fn merge_entries(
    mut event_rx: mpsc::Receiver<Component>,
    mut timezone_rx: mpsc::Receiver<Component>,
    mut done_rx: oneshot::Receiver<()>,
) -> AggregateDocument {
    let mut document = AggregateDocument::new();

    loop {
        tokio::select! {
            biased;
            Some(timezone) = timezone_rx.recv() => document.push_timezone(timezone),
            Some(event) = event_rx.recv() => document.push_event(event),
            _ = &mut done_rx => break,
        }
    }

    // All senders have finished by now; take whatever is still buffered
    while let Ok(timezone) = timezone_rx.try_recv() {
        document.push_timezone(timezone);
    }
    while let Ok(event) = event_rx.try_recv() {
        document.push_event(event);
    }

    document
}
