//! Async host for the facetstream result stream
//!
//! This crate provides:
//! - **SearchClient**: the async seam a host implements over its endpoint
//! - **TaskDispatcher**: runs each fetch as a tokio task and reports outcomes
//! - **CatalogBrowser**: owns a stream, applies outcomes and publishes snapshots
//!
//! ## Threading Model
//!
//! The stream itself is single-threaded. The browser keeps it behind a mutex
//! and touches it from two places only: the caller's methods and one applier
//! task draining fetch outcomes. Fetches check their session through a
//! shared [`facetstream_search::SessionWatch`] and skip the call when it has
//! already gone stale.
//!
//! ## Quick Start
//!
//! ```ignore
//! use facetstream_api::{CatalogBrowser, SearchClient};
//!
//! let browser = CatalogBrowser::open(client, StreamConfig::default(), criteria)?;
//! let mut updates = browser.subscribe();
//! updates.wait_for(|s| !s.is_loading).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod browser;
pub mod client;
pub mod dispatcher;

pub use browser::{BrowseSnapshot, CatalogBrowser};
pub use client::SearchClient;
pub use dispatcher::{FetchOutcome, TaskDispatcher};
