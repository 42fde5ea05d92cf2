//! Cross-crate integration tests
//!
//! Exercises the facade end to end: criteria through the query builder, the
//! tokio host and a fake endpoint, back into the visible list.

#[path = "../common/mod.rs"]
mod common;

mod browsing;
mod configuration;
mod sessions;
