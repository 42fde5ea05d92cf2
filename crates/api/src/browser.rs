//! Catalog browsing surface
//!
//! [`CatalogBrowser`] wires a [`BufferedResultStream`] to a [`SearchClient`]:
//! fetches run as tokio tasks, and a single applier task feeds their outcomes
//! back into the stream one at a time. Every change is published as a
//! [`BrowseSnapshot`] on a watch channel for the rendering side.

use crate::client::SearchClient;
use crate::dispatcher::{FetchOutcome, TaskDispatcher};
use facetstream_core::{FacetCounts, ResultItem, SearchCriteria, SessionId, StreamResult};
use facetstream_search::{
    BufferedResultStream, CancellationManager, StreamConfig, StreamPhase, StreamStats,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

type SharedStream<C> = Arc<Mutex<BufferedResultStream<TaskDispatcher<C>>>>;

// ============================================================================
// BrowseSnapshot
// ============================================================================

/// Point-in-time view of the result stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseSnapshot {
    /// Current session, if any
    pub session: Option<SessionId>,
    /// Stream phase
    pub phase: StreamPhase,
    /// Items exposed so far
    pub visible_items: Vec<ResultItem>,
    /// Items fetched but not yet exposed
    pub buffered: usize,
    /// A fetch is in flight
    pub is_loading: bool,
    /// More items can be loaded
    pub has_more: bool,
    /// The session finished with no results
    pub no_results: bool,
    /// Facet model
    pub facet_counts: FacetCounts,
    /// Failure message while in `Error`
    pub error: Option<String>,
    /// Lifetime counters
    pub stats: StreamStats,
}

impl BrowseSnapshot {
    fn capture<C: SearchClient>(stream: &BufferedResultStream<TaskDispatcher<C>>) -> Self {
        BrowseSnapshot {
            session: stream.session_id(),
            phase: stream.phase(),
            visible_items: stream.visible_items().to_vec(),
            buffered: stream.buffered_len(),
            is_loading: stream.is_loading(),
            has_more: stream.has_more(),
            no_results: stream.no_results(),
            facet_counts: stream.facet_counts().clone(),
            error: stream.error_message().map(str::to_string),
            stats: stream.stats(),
        }
    }
}

// ============================================================================
// CatalogBrowser
// ============================================================================

/// Async host for one result stream
///
/// All methods are synchronous and never wait on the network. Must be created
/// inside a tokio runtime.
///
/// # Examples
///
/// ```ignore
/// let browser = CatalogBrowser::new(client, StreamConfig::default())?;
/// let mut updates = browser.subscribe();
///
/// browser.reset(SearchCriteria::new("silk").with_category("sarees"));
/// updates.changed().await?;
/// render(&updates.borrow().visible_items);
///
/// // user scrolled to the bottom
/// browser.load_more();
/// ```
pub struct CatalogBrowser<C: SearchClient> {
    stream: SharedStream<C>,
    publisher: Arc<watch::Sender<BrowseSnapshot>>,
    snapshots: watch::Receiver<BrowseSnapshot>,
    applier: JoinHandle<()>,
}

impl<C: SearchClient> CatalogBrowser<C> {
    /// Create an idle browser over `client`
    ///
    /// # Errors
    ///
    /// Returns an error when `config` is invalid or no tokio runtime is
    /// running.
    pub fn new(client: C, config: StreamConfig) -> StreamResult<Self> {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let sessions = CancellationManager::new();
        let dispatcher =
            TaskDispatcher::on_current_runtime(Arc::new(client), outcome_tx, sessions.watch())?;
        let stream = BufferedResultStream::with_sessions(config, dispatcher, sessions)?;

        let (publisher, snapshots) = watch::channel(BrowseSnapshot::default());
        let stream = Arc::new(Mutex::new(stream));
        let publisher = Arc::new(publisher);
        let applier = tokio::spawn(apply_outcomes(
            Arc::clone(&stream),
            outcome_rx,
            Arc::clone(&publisher),
        ));

        info!(target: "facetstream::api", "Catalog browser started");
        Ok(CatalogBrowser {
            stream,
            publisher,
            snapshots,
            applier,
        })
    }

    /// Create a browser and start browsing `criteria`
    pub fn open(client: C, config: StreamConfig, criteria: SearchCriteria) -> StreamResult<Self> {
        let browser = Self::new(client, config)?;
        browser.reset(criteria);
        Ok(browser)
    }

    /// Start a new session for `criteria`
    pub fn reset(&self, criteria: SearchCriteria) {
        self.update(|stream| stream.reset(criteria));
    }

    /// Expose up to `n` buffered items
    pub fn consume_next(&self, n: usize) -> usize {
        self.update(|stream| stream.consume_next(n))
    }

    /// Expose one page worth of buffered items
    pub fn load_more(&self) -> usize {
        self.update(|stream| {
            let n = stream.config().page_size as usize;
            stream.consume_next(n)
        })
    }

    /// Re-issue the failed fetch
    pub fn retry(&self) -> bool {
        self.update(|stream| stream.retry())
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> BrowseSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<BrowseSnapshot> {
        self.snapshots.clone()
    }

    /// Criteria of the current session
    pub fn criteria(&self) -> SearchCriteria {
        self.stream.lock().criteria().clone()
    }

    /// End the session and stop applying outcomes
    pub fn shutdown(self) {
        self.update(|stream| stream.shutdown());
        debug!(target: "facetstream::api", "Catalog browser shut down");
    }

    /// Run `f` on the stream and publish the resulting snapshot
    ///
    /// The snapshot is sent before the lock is released, so snapshots reach
    /// subscribers in the order the stream changed.
    fn update<R>(&self, f: impl FnOnce(&mut BufferedResultStream<TaskDispatcher<C>>) -> R) -> R {
        let mut stream = self.stream.lock();
        let result = f(&mut stream);
        self.publisher.send_replace(BrowseSnapshot::capture(&stream));
        result
    }
}

impl<C: SearchClient> Drop for CatalogBrowser<C> {
    fn drop(&mut self) {
        self.applier.abort();
    }
}

async fn apply_outcomes<C: SearchClient>(
    stream: SharedStream<C>,
    mut outcomes: mpsc::UnboundedReceiver<FetchOutcome>,
    publisher: Arc<watch::Sender<BrowseSnapshot>>,
) {
    while let Some(outcome) = outcomes.recv().await {
        trace!(target: "facetstream::api", session = %outcome.session(), "Applying fetch outcome");
        let mut stream = stream.lock();
        match outcome {
            FetchOutcome::Page {
                session,
                page_number,
                page,
            } => {
                stream.on_page_arrived(session, page, page_number);
            }
            FetchOutcome::Failed {
                session,
                page_number,
                message,
            } => {
                stream.on_fetch_failed(session, page_number, message);
            }
        }
        // Published under the lock
        publisher.send_replace(BrowseSnapshot::capture(&stream));
    }
}
