//! Incremental faceted-search streaming
//!
//! This crate provides:
//! - QueryBuilder: deterministic criteria-to-request translation
//! - CancellationManager / SessionWatch: session ids for stale-response detection
//! - FacetAggregator: replace/accumulate merging of facet counts
//! - BufferedResultStream: visible list + read-ahead buffer state machine
//! - StreamConfig: TOML-backed configuration
//!
//! # Usage
//!
//! ```ignore
//! use facetstream_search::{BufferedResultStream, StreamConfig};
//!
//! let mut stream = BufferedResultStream::open(StreamConfig::default(), dispatcher, criteria)?;
//! // later, as fetches complete:
//! stream.on_page_arrived(ticket.session, page, ticket.page);
//! // on scroll:
//! stream.consume_next(stream.config().page_size as usize);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod facets;
pub mod query;
pub mod session;
pub mod stream;

// Re-export commonly used types
pub use config::{StreamConfig, CONFIG_FILE_NAME};
pub use facets::{FacetAggregator, FacetPolicy, MergePolicy};
pub use query::{Clause, QueryBuilder};
pub use session::{CancellationManager, SessionWatch};
pub use stream::{
    BufferedResultStream, FetchDispatcher, PageDisposition, StreamPhase, StreamState, StreamStats,
};
