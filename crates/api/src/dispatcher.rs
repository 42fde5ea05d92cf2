//! Tokio-backed fetch dispatch
//!
//! Each ticket becomes one spawned task. The task checks its session before
//! calling the client, decodes the response and reports the outcome over an
//! unbounded channel. Outcomes are applied elsewhere, in arrival order.

use crate::client::SearchClient;
use facetstream_core::{FetchTicket, ResultPage, SessionId, StreamError, StreamResult};
use facetstream_search::{FetchDispatcher, SessionWatch};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

/// Result of one dispatched fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The endpoint answered; malformed bodies arrive as the empty page
    Page {
        /// Session the fetch was issued for
        session: SessionId,
        /// Requested page number
        page_number: u32,
        /// Decoded page
        page: ResultPage,
    },
    /// The endpoint could not be reached
    Failed {
        /// Session the fetch was issued for
        session: SessionId,
        /// Requested page number
        page_number: u32,
        /// Error description
        message: String,
    },
}

impl FetchOutcome {
    /// Session the outcome belongs to
    pub fn session(&self) -> SessionId {
        match self {
            FetchOutcome::Page { session, .. } | FetchOutcome::Failed { session, .. } => *session,
        }
    }
}

/// Runs fetches as tokio tasks
pub struct TaskDispatcher<C> {
    client: Arc<C>,
    outcomes: UnboundedSender<FetchOutcome>,
    watch: SessionWatch,
    runtime: Handle,
}

impl<C: SearchClient> TaskDispatcher<C> {
    /// Create a dispatcher spawning onto `runtime`
    pub fn new(
        client: Arc<C>,
        outcomes: UnboundedSender<FetchOutcome>,
        watch: SessionWatch,
        runtime: Handle,
    ) -> Self {
        TaskDispatcher {
            client,
            outcomes,
            watch,
            runtime,
        }
    }

    /// Create a dispatcher on the runtime of the calling context
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Runtime`] when called outside a tokio runtime.
    pub fn on_current_runtime(
        client: Arc<C>,
        outcomes: UnboundedSender<FetchOutcome>,
        watch: SessionWatch,
    ) -> StreamResult<Self> {
        let runtime = Handle::try_current().map_err(|e| StreamError::runtime(e.to_string()))?;
        Ok(Self::new(client, outcomes, watch, runtime))
    }
}

impl<C: SearchClient> FetchDispatcher for TaskDispatcher<C> {
    fn dispatch(&mut self, ticket: FetchTicket) -> StreamResult<()> {
        if self.outcomes.is_closed() {
            return Err(StreamError::dispatch("outcome channel closed"));
        }

        let client = Arc::clone(&self.client);
        let outcomes = self.outcomes.clone();
        let watch = self.watch.clone();
        self.runtime.spawn(async move {
            let FetchTicket {
                session,
                page: page_number,
                request,
            } = ticket;
            if !watch.is_current(session) {
                trace!(target: "facetstream::api", session = %session, page = page_number, "Skipping fetch for stale session");
                return;
            }

            let outcome = match client.search(&request).await {
                Ok(body) => FetchOutcome::Page {
                    session,
                    page_number,
                    page: ResultPage::from_wire(&body),
                },
                Err(e) => FetchOutcome::Failed {
                    session,
                    page_number,
                    message: e.to_string(),
                },
            };
            if outcomes.send(outcome).is_err() {
                debug!(target: "facetstream::api", session = %session, page = page_number, "Browser gone, dropping outcome");
            }
        });
        Ok(())
    }
}

impl<C> fmt::Debug for TaskDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDispatcher")
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}
