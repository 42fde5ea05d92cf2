//! Session issuing and staleness checks
//!
//! Every criteria change starts a new session. Fetches carry the id of the
//! session that issued them; a response whose id is no longer current is
//! stale and gets dropped on arrival.
//!
//! The current id lives in an `AtomicU64` shared with every [`SessionWatch`],
//! so a fetch running on another thread can notice it went stale without
//! touching the engine. `0` is never issued and means "no current session".

use facetstream_core::SessionId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

const NO_SESSION: u64 = 0;

/// Issues monotonically increasing session ids
#[derive(Debug)]
pub struct CancellationManager {
    /// Last id handed out; ids are never reused
    last_issued: u64,
    current: Arc<AtomicU64>,
}

impl Default for CancellationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationManager {
    /// Create a manager with no current session
    pub fn new() -> Self {
        CancellationManager {
            last_issued: NO_SESSION,
            current: Arc::new(AtomicU64::new(NO_SESSION)),
        }
    }

    /// Start a new session and make it current
    pub fn new_session(&mut self) -> SessionId {
        self.last_issued += 1;
        self.current.store(self.last_issued, Ordering::Release);
        trace!(target: "facetstream::session", session = self.last_issued, "Session started");
        SessionId::new(self.last_issued)
    }

    /// Whether `session` is the current session
    pub fn is_current(&self, session: SessionId) -> bool {
        session.as_u64() != NO_SESSION && self.current.load(Ordering::Acquire) == session.as_u64()
    }

    /// Make every issued session stale
    ///
    /// Takes effect before this call returns.
    pub fn invalidate(&mut self) {
        let previous = self.current.swap(NO_SESSION, Ordering::AcqRel);
        if previous != NO_SESSION {
            trace!(target: "facetstream::session", session = previous, "Session invalidated");
        }
    }

    /// The current session, if any
    pub fn current(&self) -> Option<SessionId> {
        match self.current.load(Ordering::Acquire) {
            NO_SESSION => None,
            raw => Some(SessionId::new(raw)),
        }
    }

    /// A thread-safe read-only view of the current session
    pub fn watch(&self) -> SessionWatch {
        SessionWatch {
            current: Arc::clone(&self.current),
        }
    }
}

/// Read-only handle on a [`CancellationManager`]'s current session
///
/// Cheap to clone and `Send + Sync`; meant to be moved into fetch tasks.
#[derive(Debug, Clone)]
pub struct SessionWatch {
    current: Arc<AtomicU64>,
}

impl SessionWatch {
    /// Whether `session` is still current
    pub fn is_current(&self, session: SessionId) -> bool {
        session.as_u64() != NO_SESSION && self.current.load(Ordering::Acquire) == session.as_u64()
    }
}
