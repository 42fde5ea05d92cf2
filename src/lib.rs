//! facetstream - incremental faceted-search result streaming
//!
//! facetstream keeps a catalog browsing surface responsive while results
//! arrive page by page: facet selections become a deterministic filter, every
//! change of criteria starts a fresh session, late responses from replaced
//! sessions are dropped, and the next page is fetched before the user
//! reaches the end of what is shown.
//!
//! # Quick Start
//!
//! ```ignore
//! use facetstream::{CatalogBrowser, SearchCriteria, StreamConfig};
//!
//! let browser = CatalogBrowser::new(client, StreamConfig::default())?;
//! let mut updates = browser.subscribe();
//!
//! browser.reset(SearchCriteria::new("").select("color", "red").with_category("sarees"));
//! updates.wait_for(|s| !s.is_loading).await?;
//!
//! // near the bottom of the list
//! browser.load_more();
//! ```
//!
//! # Architecture
//!
//! - `facetstream-core`: data model, wire decoding and errors
//! - `facetstream-search`: the synchronous engine ([`BufferedResultStream`])
//!   and its helpers
//! - `facetstream-api`: the tokio host ([`CatalogBrowser`])
//!
//! Hosts with their own scheduling can drive [`BufferedResultStream`]
//! directly through a [`FetchDispatcher`].

pub use facetstream_api::{
    BrowseSnapshot, CatalogBrowser, FetchOutcome, SearchClient, TaskDispatcher,
};
pub use facetstream_core::{
    decode_page, FacetCounts, FetchRequest, FetchTicket, NumericRange, ResultItem, ResultPage,
    Scope, SearchCriteria, SessionId, SortKey, StreamError, StreamResult,
};
pub use facetstream_search::{
    BufferedResultStream, CancellationManager, FacetAggregator, FacetPolicy, FetchDispatcher,
    MergePolicy, PageDisposition, QueryBuilder, SessionWatch, StreamConfig, StreamPhase,
    StreamState, StreamStats, CONFIG_FILE_NAME,
};
