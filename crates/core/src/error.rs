//! Error types for facetstream
//!
//! This module defines the error types shared by every crate in the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! None of these errors ever unwind through the result stream. The engine
//! converts fetch-level failures into state transitions; `StreamError` is what
//! collaborators hand back to it and what configuration loading returns.

use thiserror::Error;

/// Result type alias for facetstream operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Error types for the result stream and its collaborators
#[derive(Debug, Error)]
pub enum StreamError {
    /// The search endpoint could not be reached or answered with an error
    #[error("transport error: {0}")]
    Transport(String),

    /// The search endpoint answered with a body that could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A fetch could not be handed to the fetch collaborator
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// The async runtime needed by a host is unavailable
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl StreamError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        StreamError::Transport(message.into())
    }

    /// Create a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        StreamError::MalformedResponse(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        StreamError::Config(message.into())
    }

    /// Create a dispatch error
    pub fn dispatch(message: impl Into<String>) -> Self {
        StreamError::Dispatch(message.into())
    }

    /// Create a runtime error
    pub fn runtime(message: impl Into<String>) -> Self {
        StreamError::Runtime(message.into())
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::MalformedResponse(e.to_string())
    }
}
