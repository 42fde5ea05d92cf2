//! Buffered, incrementally fetched result stream
//!
//! This module provides:
//! - BufferedResultStream: the state machine between UI events and the search endpoint
//! - FetchDispatcher: the seam through which fetches leave the engine
//! - StreamState / StreamPhase: the explicit state owned by one engine
//! - StreamStats: lifetime counters for diagnostics
//!
//! # Phases
//!
//! ```text
//!            reset                page 0              consume_next
//!   Idle ──────────▶ Fetching ──────────▶ Streaming ◀──────────────▶ Refilling
//!                       │                     │          page n          │
//!                       │ failure             │ last page                │ failure
//!                       ▼                     ▼                          ▼
//!                     Error              Exhausted                     Error
//! ```
//!
//! # Invariants
//!
//! - `visible` only grows within a session; `reset` is the only way to shrink it.
//! - `buffer` is drained strictly front first.
//! - At most one fetch is in flight, and only the current session's results apply.
//! - Pages apply in increasing page-number order, each at most once.

use crate::config::StreamConfig;
use crate::facets::FacetAggregator;
use crate::query::QueryBuilder;
use crate::session::{CancellationManager, SessionWatch};
use facetstream_core::{
    FacetCounts, FetchTicket, ResultItem, ResultPage, SearchCriteria, SessionId, StreamResult,
};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace, warn};

// ============================================================================
// FetchDispatcher
// ============================================================================

/// Hands fetches to whatever talks to the search endpoint
///
/// `dispatch` must return promptly. The outcome of the fetch comes back later
/// through [`BufferedResultStream::on_page_arrived`] or
/// [`BufferedResultStream::on_fetch_failed`], tagged with the ticket's
/// session id and page number.
///
/// An `Err` from `dispatch` means the fetch was never started; the engine
/// treats it as a failed fetch.
pub trait FetchDispatcher {
    /// Start fetching `ticket`
    fn dispatch(&mut self, ticket: FetchTicket) -> StreamResult<()>;
}

impl<F> FetchDispatcher for F
where
    F: FnMut(FetchTicket) -> StreamResult<()>,
{
    fn dispatch(&mut self, ticket: FetchTicket) -> StreamResult<()> {
        self(ticket)
    }
}

// ============================================================================
// StreamPhase / StreamState
// ============================================================================

/// Lifecycle phase of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    /// No session has been started
    #[default]
    Idle,
    /// The first page of the session is in flight
    Fetching,
    /// Items are available and no fetch is in flight
    Streaming,
    /// A follow-up page is in flight
    Refilling,
    /// The endpoint has no further pages for this session
    Exhausted,
    /// The last fetch failed; `reset` or `retry` recovers
    Error,
}

/// Everything the engine knows about the current session
///
/// Replaced wholesale by `reset`; mutated in place by the other operations.
#[derive(Debug, Clone, Default)]
pub struct StreamState {
    /// Items exposed to the consumer, in server order
    pub visible: Vec<ResultItem>,
    /// Items fetched but not yet exposed
    pub buffer: VecDeque<ResultItem>,
    /// Page number the next refill will request
    pub next_page_to_fetch: u32,
    /// Page number that must be applied next
    pub expected_page_sequence: u32,
    /// No further pages exist for this session
    pub exhausted: bool,
    /// The session this state belongs to
    pub session_id: Option<SessionId>,
    /// Current phase
    pub phase: StreamPhase,
    /// Pages that arrived ahead of their turn, keyed by page number
    pub pending: BTreeMap<u32, ResultPage>,
    /// Page number of the fetch in flight
    pub in_flight: Option<u32>,
    /// Message of the failure that put the stream in `Error`
    pub error: Option<String>,
}

/// What `on_page_arrived` did with a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDisposition {
    /// Applied, possibly along with held pages that became due
    Applied,
    /// Held until the pages before it arrive
    Held,
    /// From a session that is no longer current
    Stale,
    /// Already applied or already held
    Duplicate,
    /// The session is exhausted or failed and takes no more pages
    Ignored,
}

/// Lifetime counters, kept across resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    /// Fetches handed to the dispatcher
    pub fetches_issued: u64,
    /// Pages applied to a session
    pub pages_applied: u64,
    /// Pages and failures dropped because their session was stale
    pub stale_discarded: u64,
    /// Pages dropped as duplicates
    pub duplicates_discarded: u64,
    /// Pages held because they arrived out of order
    pub out_of_order_held: u64,
    /// Fetch failures that put a session in `Error`
    pub failures: u64,
}

// ============================================================================
// BufferedResultStream
// ============================================================================

/// Incremental result stream for one browsing surface
///
/// Owns the visible list, the read-ahead buffer and the facet model. The host
/// serializes calls; the engine never blocks and never fetches more than one
/// page ahead of consumption.
///
/// # Example
///
/// ```
/// use facetstream_core::{FetchTicket, ResultItem, ResultPage, SearchCriteria, StreamResult};
/// use facetstream_search::{BufferedResultStream, StreamConfig, StreamPhase};
///
/// let config = StreamConfig::default().with_page_size(2);
/// let dispatcher = |ticket: FetchTicket| -> StreamResult<()> {
///     println!("fetch page {}", ticket.page);
///     Ok(())
/// };
/// let mut stream = BufferedResultStream::new(config, dispatcher).unwrap();
///
/// stream.reset(SearchCriteria::new("silk"));
/// let session = stream.session_id().unwrap();
/// let page = ResultPage::new(vec![ResultItem::new("a"), ResultItem::new("b")], 2);
/// stream.on_page_arrived(session, page, 0);
///
/// assert_eq!(stream.visible_items().len(), 2);
/// assert_eq!(stream.phase(), StreamPhase::Streaming);
/// ```
#[derive(Debug)]
pub struct BufferedResultStream<D: FetchDispatcher> {
    config: StreamConfig,
    dispatcher: D,
    sessions: CancellationManager,
    criteria: SearchCriteria,
    state: StreamState,
    facets: FacetCounts,
    stats: StreamStats,
}

impl<D: FetchDispatcher> BufferedResultStream<D> {
    /// Create an idle stream
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn new(config: StreamConfig, dispatcher: D) -> StreamResult<Self> {
        Self::with_sessions(config, dispatcher, CancellationManager::new())
    }

    /// Create an idle stream around an existing session manager
    ///
    /// Lets a host hand a [`SessionWatch`] to its dispatcher before the
    /// stream exists.
    pub fn with_sessions(
        config: StreamConfig,
        dispatcher: D,
        sessions: CancellationManager,
    ) -> StreamResult<Self> {
        config.validate()?;
        Ok(BufferedResultStream {
            config,
            dispatcher,
            sessions,
            criteria: SearchCriteria::default(),
            state: StreamState::default(),
            facets: FacetCounts::new(),
            stats: StreamStats::default(),
        })
    }

    /// Create a stream and start its first session
    pub fn open(config: StreamConfig, dispatcher: D, criteria: SearchCriteria) -> StreamResult<Self> {
        let mut stream = Self::new(config, dispatcher)?;
        stream.reset(criteria);
        Ok(stream)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Start a new session for `criteria`
    ///
    /// Every earlier fetch becomes stale before page 0 of the new session is
    /// issued. The facet model is kept so accumulating fields can show
    /// sibling counts across refinements.
    pub fn reset(&mut self, criteria: SearchCriteria) {
        self.sessions.invalidate();
        let session = self.sessions.new_session();
        debug!(target: "facetstream::stream", session = %session, "Resetting result stream");

        self.criteria = criteria;
        self.state = StreamState {
            session_id: Some(session),
            phase: StreamPhase::Fetching,
            ..StreamState::default()
        };
        self.issue(0);
    }

    /// Expose up to `n` buffered items, refilling when the buffer runs low
    ///
    /// Returns how many items moved into the visible list.
    pub fn consume_next(&mut self, n: usize) -> usize {
        let take = n.min(self.state.buffer.len());
        self.state.visible.extend(self.state.buffer.drain(..take));

        if self.state.buffer.len() <= self.config.refill_threshold()
            && self.state.phase == StreamPhase::Streaming
            && !self.state.exhausted
        {
            self.state.phase = StreamPhase::Refilling;
            let page = self.state.next_page_to_fetch;
            self.issue(page);
        }
        take
    }

    /// Deliver a fetched page
    ///
    /// Stale, duplicate and late pages are dropped without touching state.
    /// A page ahead of its turn is held until the pages before it apply.
    pub fn on_page_arrived(
        &mut self,
        session: SessionId,
        page: ResultPage,
        page_number: u32,
    ) -> PageDisposition {
        if !self.sessions.is_current(session) {
            self.stats.stale_discarded += 1;
            debug!(target: "facetstream::stream", session = %session, page = page_number, "Discarding page from stale session");
            return PageDisposition::Stale;
        }

        if matches!(self.state.phase, StreamPhase::Exhausted | StreamPhase::Error) {
            debug!(target: "facetstream::stream", session = %session, page = page_number, phase = ?self.state.phase, "Ignoring page");
            return PageDisposition::Ignored;
        }

        let expected = self.state.expected_page_sequence;
        if page_number < expected || self.state.pending.contains_key(&page_number) {
            self.stats.duplicates_discarded += 1;
            debug!(target: "facetstream::stream", session = %session, page = page_number, "Discarding duplicate page");
            return PageDisposition::Duplicate;
        }

        if page_number > expected {
            self.hold(session, page, page_number);
            return PageDisposition::Held;
        }

        self.apply(page, page_number);
        while !self.state.exhausted {
            let next = self.state.expected_page_sequence;
            match self.state.pending.remove(&next) {
                Some(held) => self.apply(held, next),
                None => break,
            }
        }

        if self.state.exhausted && !self.state.pending.is_empty() {
            warn!(
                target: "facetstream::stream",
                session = %session,
                dropped = self.state.pending.len(),
                "Dropping held pages past the last page"
            );
            self.state.pending.clear();
        }
        PageDisposition::Applied
    }

    /// Deliver a fetch failure
    ///
    /// Moves the current session to `Error`, keeping every item already
    /// fetched. Returns `false` when the failure was stale or not for the
    /// fetch in flight.
    pub fn on_fetch_failed(
        &mut self,
        session: SessionId,
        page_number: u32,
        message: impl Into<String>,
    ) -> bool {
        if !self.sessions.is_current(session) {
            self.stats.stale_discarded += 1;
            debug!(target: "facetstream::stream", session = %session, page = page_number, "Discarding failure from stale session");
            return false;
        }
        if self.state.in_flight != Some(page_number) {
            debug!(target: "facetstream::stream", session = %session, page = page_number, "Ignoring failure for a page not in flight");
            return false;
        }
        self.fail(message.into());
        true
    }

    /// Re-issue the fetch that failed
    ///
    /// Only acts in the `Error` phase. Visible and buffered items stay in
    /// place. Returns whether a fetch was issued.
    pub fn retry(&mut self) -> bool {
        if self.state.phase != StreamPhase::Error || self.state.session_id.is_none() {
            return false;
        }
        let page = self.state.expected_page_sequence;
        debug!(target: "facetstream::stream", page, "Retrying failed fetch");
        self.state.error = None;
        self.state.phase = if page == 0 {
            StreamPhase::Fetching
        } else {
            StreamPhase::Refilling
        };
        self.issue(page);
        true
    }

    /// End the current session and return to `Idle`
    ///
    /// Outstanding fetches become stale; their results will be dropped.
    pub fn shutdown(&mut self) {
        self.sessions.invalidate();
        self.state = StreamState::default();
        self.facets.clear();
        debug!(target: "facetstream::stream", "Result stream shut down");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn issue(&mut self, page: u32) {
        let Some(session) = self.state.session_id else {
            return;
        };
        let request = QueryBuilder::build(&self.criteria, page, self.config.page_size);
        self.state.in_flight = Some(page);
        self.state.next_page_to_fetch = page + 1;
        self.stats.fetches_issued += 1;
        trace!(target: "facetstream::stream", session = %session, page, filter = %request.filter_expression, "Issuing fetch");

        let ticket = FetchTicket {
            session,
            page,
            request,
        };
        if let Err(e) = self.dispatcher.dispatch(ticket) {
            self.fail(e.to_string());
        }
    }

    fn hold(&mut self, session: SessionId, page: ResultPage, page_number: u32) {
        let expected = self.state.expected_page_sequence;
        if page_number > expected + 1 {
            warn!(
                target: "facetstream::stream",
                session = %session,
                page = page_number,
                expected,
                "Page arrived more than one position ahead; the fetch collaborator issued overlapping fetches"
            );
        }
        self.state.pending.insert(page_number, page);
        self.stats.out_of_order_held += 1;
        if self.state.pending.len() > self.config.max_pending_pages {
            warn!(
                target: "facetstream::stream",
                session = %session,
                held = self.state.pending.len(),
                expected,
                "Out-of-order pages are piling up"
            );
        }
    }

    fn apply(&mut self, page: ResultPage, page_number: u32) {
        let item_count = page.items.len();
        if page_number == 0 && self.state.visible.is_empty() {
            self.state.visible.extend(page.items);
        } else {
            self.state.buffer.extend(page.items);
        }

        self.state.expected_page_sequence = page_number + 1;
        self.state.next_page_to_fetch = self.state.next_page_to_fetch.max(page_number + 1);
        if self.state.in_flight == Some(page_number) {
            self.state.in_flight = None;
        }
        self.state.exhausted = page_number.saturating_add(1) >= page.total_pages
            || item_count < self.config.page_size as usize;

        // Later pages without counts leave the model alone
        if page_number == 0 || !page.facet_counts.is_empty() {
            let policy = self.config.facet_policy;
            let criteria = &self.criteria;
            self.facets = FacetAggregator::merge_by_field(&self.facets, &page.facet_counts, |field| {
                policy.policy_for(criteria, field)
            });
        }

        self.state.phase = if self.state.exhausted {
            StreamPhase::Exhausted
        } else if self.state.in_flight.is_some() {
            self.state.phase
        } else {
            StreamPhase::Streaming
        };
        self.stats.pages_applied += 1;
        trace!(
            target: "facetstream::stream",
            page = page_number,
            items = item_count,
            exhausted = self.state.exhausted,
            "Applied page"
        );
    }

    fn fail(&mut self, message: String) {
        warn!(
            target: "facetstream::stream",
            session = ?self.state.session_id,
            page = ?self.state.in_flight,
            error = %message,
            "Fetch failed"
        );
        self.state.phase = StreamPhase::Error;
        self.state.in_flight = None;
        self.state.error = Some(message);
        self.stats.failures += 1;
    }

    // ========================================================================
    // Projections
    // ========================================================================

    /// Items exposed to the consumer
    pub fn visible_items(&self) -> &[ResultItem] {
        &self.state.visible
    }

    /// Items fetched but not yet exposed
    pub fn buffered_len(&self) -> usize {
        self.state.buffer.len()
    }

    /// A fetch is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self.state.phase, StreamPhase::Fetching | StreamPhase::Refilling)
    }

    /// More items can still be exposed, from the buffer or the endpoint
    pub fn has_more(&self) -> bool {
        self.state.phase != StreamPhase::Idle && (!self.state.exhausted || !self.state.buffer.is_empty())
    }

    /// The session finished without a single result
    pub fn no_results(&self) -> bool {
        self.state.phase == StreamPhase::Exhausted
            && self.state.visible.is_empty()
            && self.state.buffer.is_empty()
    }

    /// Current facet model
    ///
    /// After a reset this still holds the previous session's counts until the
    /// new session's first page with counts is applied.
    pub fn facet_counts(&self) -> &FacetCounts {
        &self.facets
    }

    /// Current phase
    pub fn phase(&self) -> StreamPhase {
        self.state.phase
    }

    /// Message of the failure behind the `Error` phase
    pub fn error_message(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    /// Current session, if one is running
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.session_id
    }

    /// Criteria of the current session
    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    /// Full state, read-only
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Lifetime counters
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Configuration in use
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Thread-safe staleness check for fetch tasks
    pub fn session_watch(&self) -> SessionWatch {
        self.sessions.watch()
    }

    /// The dispatcher
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// The dispatcher, mutably
    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }
}
