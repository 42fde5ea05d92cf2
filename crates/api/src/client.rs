//! Search endpoint seam
//!
//! The browser never talks to a transport directly. A host implements
//! [`SearchClient`] over whatever carries its requests (HTTP, an in-process
//! index, a test fixture) and hands it to the browser.

use async_trait::async_trait;
use facetstream_core::{FetchRequest, StreamResult};
use serde_json::Value;

/// Asynchronous search endpoint
///
/// `search` returns the raw response body. Decoding happens on the browser
/// side, so a body with an unexpected shape degrades to an empty page instead
/// of failing the session.
///
/// # Errors
///
/// Implementations return [`facetstream_core::StreamError::Transport`] when the
/// request could not be completed.
#[async_trait]
pub trait SearchClient: Send + Sync + 'static {
    /// Execute one page request
    async fn search(&self, request: &FetchRequest) -> StreamResult<Value>;
}

#[async_trait]
impl<C: SearchClient> SearchClient for std::sync::Arc<C> {
    async fn search(&self, request: &FetchRequest) -> StreamResult<Value> {
        (**self).search(request).await
    }
}
