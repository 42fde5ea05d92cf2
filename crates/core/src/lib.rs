//! Core types for facetstream
//!
//! This crate defines the foundational types used throughout the system:
//! - SearchCriteria: complete filter state (free text, scope, facets, range, sort)
//! - SessionId: one generation of criteria
//! - FetchRequest / FetchTicket: what the result stream asks the search endpoint for
//! - ResultPage / ResultItem / FacetCounts: what comes back
//! - Wire decoding of endpoint responses
//! - StreamError: error type shared by all crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod search_types;
pub mod types;
pub mod wire;

pub use error::{StreamError, StreamResult};
pub use search_types::{FacetCounts, FetchRequest, FetchTicket, ResultItem, ResultPage};
pub use types::{NumericRange, Scope, SearchCriteria, SessionId, SortKey};
pub use wire::decode_page;
